use clap::Parser;
use consulting_agent::{
    config::PlannerStrategy, logging, AppConfig, Orchestrator, SessionState, TurnEvent,
    TurnOutcome,
};
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use tracing::info;

/// 소상공인 컨설팅 챗봇
#[derive(Parser, Debug)]
#[command(name = "chatbot", version)]
struct Cli {
    /// Question to ask once; omit for an interactive session
    request: Option<String>,

    /// Planner strategy: llm or keyword
    #[arg(long)]
    planner: Option<PlannerStrategy>,

    /// Directory holding the CSV datasets
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Executor iteration ceiling per turn
    #[arg(long)]
    max_iterations: Option<usize>,

    /// Default log filter when RUST_LOG is unset
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    let mut config = AppConfig::from_env()?;
    if let Some(planner) = cli.planner {
        config.planner = planner;
    }
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }
    if let Some(max_iterations) = cli.max_iterations.filter(|n| *n > 0) {
        config.max_iterations = max_iterations;
    }
    if config.gemini_api_key.is_empty() {
        eprintln!("⚠️  GEMINI_API_KEY not set in .env");
        eprintln!("📌 See .env.example for setup instructions");
    }

    info!(planner = ?config.planner, data_dir = %config.data_dir.display(), "Chatbot starting");
    let orchestrator = Orchestrator::from_config(&config);

    match cli.request {
        Some(request) => match ask(&orchestrator, &request, None).await {
            Ok(outcome) => {
                println!("\n{}", outcome.final_answer);
                Ok(())
            }
            Err(e) => {
                eprintln!("❌ {}", e.user_message());
                Err(Box::new(e) as Box<dyn std::error::Error>)
            }
        },
        None => interactive(&orchestrator).await,
    }
}

async fn interactive(orchestrator: &Orchestrator) -> Result<(), Box<dyn std::error::Error>> {
    println!("💼 소상공인 컨설팅 챗봇입니다. 무엇이든 물어보세요.");
    println!("   (/resume: 중단된 답변 이어서 받기, /quit: 종료)\n");

    let mut session = SessionState::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("질문> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();

        let result = match line {
            "" => continue,
            "/quit" | "/exit" => break,
            "/resume" => orchestrator.resume(session.clone()).await,
            request => ask(orchestrator, request, Some(session.clone())).await,
        };

        match result {
            Ok(outcome) => {
                println!("\n{}\n", outcome.final_answer);
                session = outcome.session;
            }
            Err(e) => {
                eprintln!("❌ {}", e.user_message());
                if e.is_retryable() {
                    eprintln!("   /resume 으로 이어서 시도할 수 있습니다.\n");
                }
            }
        }
    }

    println!("👋 이용해 주셔서 감사합니다.");
    Ok(())
}

/// Run one turn while printing progress as it happens.
async fn ask(
    orchestrator: &Orchestrator,
    request: &str,
    session: Option<SessionState>,
) -> consulting_agent::Result<TurnOutcome> {
    let (tx, rx) = unbounded_channel();
    let (outcome, ()) = tokio::join!(
        orchestrator.run_turn_with_events(request, session, tx),
        print_progress(rx)
    );
    outcome
}

async fn print_progress(mut rx: UnboundedReceiver<TurnEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            TurnEvent::Planned { plan } if plan.is_empty() => {
                println!("⏳ 도구 없이 답변을 작성합니다...");
            }
            TurnEvent::Planned { plan } => {
                println!("📋 실행 계획 ({}단계)", plan.len());
                for step in &plan {
                    println!("   {}", step);
                }
            }
            TurnEvent::StepExecuted { entry, remaining } => {
                if entry.result.is_success() {
                    println!("✅ {} ({}ms)", entry.step, entry.elapsed_ms);
                } else {
                    println!("⚠️  {} → {}", entry.step, entry.result.evidence_text());
                }
                if remaining.is_empty() {
                    println!("⏳ 답변을 작성하고 있습니다...");
                }
            }
            TurnEvent::Answered { .. } => {}
        }
    }
}

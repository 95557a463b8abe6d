//! Data analysis (`data_analyzer`)
//!
//! Loads every CSV in the data directory, builds a compact preview of each
//! file and asks the model for a readable analysis summary.

use crate::error::OrchestrationError;
use crate::llm::LanguageModel;
use crate::models::ToolKind;
use crate::tools::Tool;
use crate::Result;
use encoding_rs::EUC_KR;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

const DEFAULT_PREVIEW_ROWS: usize = 20;

/// One loaded CSV file.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub alias: String,
    pub file_name: String,
    pub header: String,
    pub rows: Vec<String>,
    /// Column dictionary rather than data.
    pub is_layout: bool,
}

impl Dataset {
    fn from_text(alias: String, file_name: String, text: &str) -> Self {
        let mut lines = text
            .lines()
            .map(|l| l.trim_end_matches('\r'))
            .filter(|l| !l.trim().is_empty());

        let header = lines.next().unwrap_or_default().to_string();
        let rows = lines.map(str::to_string).collect();
        let lowered = file_name.to_lowercase();
        let is_layout = lowered.contains("layout") || file_name.contains("레이아웃");

        Self {
            alias,
            file_name,
            header,
            rows,
            is_layout,
        }
    }

    fn preview(&self, max_rows: usize) -> String {
        let mut out = format!(
            "- {}: '{}' ({}행{})\n  컬럼: {}\n",
            self.alias,
            self.file_name,
            self.rows.len(),
            if self.is_layout { ", 컬럼 설명서" } else { "" },
            self.header
        );
        for row in self.rows.iter().take(max_rows) {
            out.push_str("  ");
            out.push_str(row);
            out.push('\n');
        }
        out
    }
}

/// Decode as UTF-8, then as cp949 (EUC-KR superset) for legacy Korean exports.
/// A lossy cp949 decode is the last resort.
fn decode(file_name: &str, bytes: Vec<u8>) -> String {
    let bytes = match String::from_utf8(bytes) {
        Ok(text) => return text.trim_start_matches('\u{feff}').to_string(),
        Err(e) => e.into_bytes(),
    };

    let (text, had_errors) = EUC_KR.decode_without_bom_handling(&bytes);
    if had_errors {
        warn!(file = %file_name, "CSV is neither UTF-8 nor cp949, decoding lossily");
    } else {
        debug!(file = %file_name, "CSV decoded as cp949");
    }
    text.into_owned()
}

/// Load every `*.csv` under `dir`, sorted by file name.
pub async fn load_datasets(dir: &Path) -> Result<Vec<Dataset>> {
    let mut entries = tokio::fs::read_dir(dir).await.map_err(|e| {
        OrchestrationError::ToolError(format!("'{}' 폴더를 열 수 없습니다: {}", dir.display(), e))
    })?;

    let mut paths = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_csv = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);
        if is_csv {
            paths.push(path);
        }
    }
    paths.sort();

    let mut datasets = Vec::with_capacity(paths.len());
    for (i, path) in paths.iter().enumerate() {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let bytes = tokio::fs::read(path).await?;
        let text = decode(&file_name, bytes);
        datasets.push(Dataset::from_text(format!("df{}", i + 1), file_name, &text));
    }

    Ok(datasets)
}

pub struct DataAnalysisTool {
    data_dir: PathBuf,
    model: Arc<dyn LanguageModel>,
    preview_rows: usize,
}

impl DataAnalysisTool {
    pub fn new(data_dir: PathBuf, model: Arc<dyn LanguageModel>) -> Self {
        Self {
            data_dir,
            model,
            preview_rows: DEFAULT_PREVIEW_ROWS,
        }
    }

    pub fn with_preview_rows(mut self, preview_rows: usize) -> Self {
        self.preview_rows = preview_rows;
        self
    }

    fn build_prompt(&self, datasets: &[Dataset], query: &str) -> String {
        let previews: String = datasets
            .iter()
            .map(|d| d.preview(self.preview_rows))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            r#"당신은 여러 개의 데이터셋(df1, df2, ...)을 다루는 AI 데이터 분석 전문가입니다.

**[사용 가능한 데이터셋 정보]**
{previews}
**[행동 강령]**
1. 사용자가 한글 컬럼명을 언급하면, 먼저 '컬럼 설명서'로 표시된 파일에서 해당하는 실제 컬럼명을 찾으세요.
2. 위에 제공된 데이터에서 확인할 수 있는 사실만 사용하세요. 표본 행만 보이는 경우 그 한계를 밝히세요.
3. 최종 답변은 반드시 사람이 읽기 좋은 분석 요약이어야 합니다. 코드를 답변으로 반환하지 마세요.

**[분석 요청]**
{query}
"#
        )
    }
}

#[async_trait::async_trait]
impl Tool for DataAnalysisTool {
    fn kind(&self) -> ToolKind {
        ToolKind::DataAnalyzer
    }

    async fn invoke(&self, query: &str) -> Result<String> {
        let datasets = load_datasets(&self.data_dir).await?;
        if datasets.is_empty() {
            return Err(OrchestrationError::ToolError(format!(
                "분석할 CSV 파일이 '{}' 폴더에 없습니다.",
                self.data_dir.display()
            )));
        }

        info!(
            files = ?datasets.iter().map(|d| d.file_name.as_str()).collect::<Vec<_>>(),
            "Loaded CSV datasets"
        );

        let prompt = self.build_prompt(&datasets, query);
        self.model.complete(&prompt).await
    }
}

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocDiag {
    pub gs_exe: String,
    pub gs_version: Option<String>,
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Raw inkcov output for one page range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InkcovOut {
    pub start_page: u32,
    pub end_page: u32,
    pub stdout: String,
}

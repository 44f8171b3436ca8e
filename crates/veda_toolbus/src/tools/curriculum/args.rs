use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CurriculumArgs {
    #[serde(default)]
    pub chapter: Option<String>,
}

impl CurriculumArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chapter(mut self, chapter: impl Into<String>) -> Self {
        self.chapter = Some(chapter.into());
        self
    }
}

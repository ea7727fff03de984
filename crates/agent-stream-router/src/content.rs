/// Display text forwarded by a completed run.
#[derive(Clone, Debug, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct RunOutput {
    /// Chunks in the order they were forwarded.
    pub chunks: Vec<String>,
}

impl RunOutput {
    /// Concatenates all chunks in order.
    pub fn text(&self) -> String {
        self.chunks.concat()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

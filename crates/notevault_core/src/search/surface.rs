//! Editor surface seam used by the highlight controller.

/// Live, mutable view of the page being edited.
pub trait EditorSurface {
    fn title(&self) -> String;
    fn set_title(&mut self, title: String);
    fn markup(&self) -> String;
    fn set_markup(&mut self, markup: String);

    /// Scrolls the n-th result into view. Surfaces without a viewport ignore it.
    fn reveal_match(&mut self, _index: usize) {}
}

/// In-memory surface for headless sessions and tests.
#[derive(Debug, Clone, Default)]
pub struct MemorySurface {
    title: String,
    markup: String,
    revealed: Vec<usize>,
}

impl MemorySurface {
    pub fn new(title: impl Into<String>, markup: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            markup: markup.into(),
            revealed: Vec::new(),
        }
    }

    /// Result indices revealed so far, oldest first.
    pub fn revealed(&self) -> &[usize] {
        &self.revealed
    }
}

impl EditorSurface for MemorySurface {
    fn title(&self) -> String {
        self.title.clone()
    }

    fn set_title(&mut self, title: String) {
        self.title = title;
    }

    fn markup(&self) -> String {
        self.markup.clone()
    }

    fn set_markup(&mut self, markup: String) {
        self.markup = markup;
    }

    fn reveal_match(&mut self, index: usize) {
        self.revealed.push(index);
    }
}

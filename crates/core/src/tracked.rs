/// A value together with the state it had when last loaded or saved.
///
/// `original` is `None` for values that have never been persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Tracked<T> {
    value: T,
    original: Option<T>,
}

impl<T: Clone + PartialEq> Tracked<T> {
    /// Wrap a value that has never been persisted.
    pub fn new(value: T) -> Self {
        Self {
            value,
            original: None,
        }
    }

    /// Wrap a value freshly read from storage.
    pub fn loaded(value: T) -> Self {
        Self {
            original: Some(value.clone()),
            value,
        }
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.value
    }

    pub fn into_inner(self) -> T {
        self.value
    }

    /// The last persisted state, if any.
    pub fn persisted(&self) -> Option<&T> {
        self.original.as_ref()
    }

    pub fn is_new(&self) -> bool {
        self.original.is_none()
    }

    /// True when the in-memory value differs from the persisted one.
    pub fn is_changed(&self) -> bool {
        self.original.as_ref().is_some_and(|o| *o != self.value)
    }

    /// New or changed.
    pub fn is_dirty(&self) -> bool {
        self.is_new() || self.is_changed()
    }

    /// Replace both states with what storage returned.
    pub fn mark_saved(&mut self, saved: T) {
        self.original = Some(saved.clone());
        self.value = saved;
    }

    /// Apply an edit that has already been written, to both states.
    pub fn apply_saved(&mut self, edit: impl Fn(&mut T)) {
        edit(&mut self.value);
        if let Some(original) = self.original.as_mut() {
            edit(original);
        }
    }
}

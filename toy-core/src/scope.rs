#![forbid(unsafe_code)]

/// Nested lexical scopes in declaration order.
///
/// `var(name, ..)` semantics are built on this: update the innermost visible binding,
/// or declare a new one in the innermost scope.
#[derive(Clone, Debug)]
pub struct Scopes<T> {
    frames: Vec<Vec<(String, T)>>,
}

impl<T> Default for Scopes<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scopes<T> {
    pub fn new() -> Self {
        Scopes {
            frames: vec![Vec::new()],
        }
    }

    pub fn push(&mut self) {
        self.frames.push(Vec::new());
    }

    /// Pops the innermost scope. The outermost scope is never popped.
    pub fn pop(&mut self) -> Vec<(String, T)> {
        if self.frames.len() > 1 {
            self.frames.pop().unwrap_or_default()
        } else {
            Vec::new()
        }
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.iter().find(|(n, _)| n == name).map(|(_, v)| v))
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut T> {
        self.frames
            .iter_mut()
            .rev()
            .find_map(|frame| frame.iter_mut().find(|(n, _)| n == name).map(|(_, v)| v))
    }

    pub fn declare(&mut self, name: impl Into<String>, value: T) {
        let name = name.into();
        let Some(frame) = self.frames.last_mut() else {
            return;
        };
        match frame.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => frame.push((name, value)),
        }
    }

    /// Updates the visible binding or declares it innermost. Returns the replaced value.
    pub fn assign(&mut self, name: &str, value: T) -> Option<T> {
        match self.get_mut(name) {
            Some(slot) => Some(std::mem::replace(slot, value)),
            None => {
                self.declare(name, value);
                None
            }
        }
    }

    /// Every binding, outermost scope first.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.frames
            .iter()
            .flat_map(|frame| frame.iter().map(|(n, v)| (n.as_str(), v)))
    }
}

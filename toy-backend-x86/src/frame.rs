#![forbid(unsafe_code)]

use std::fmt;

/// A 32-bit stack slot addressed from `ebp`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Slot {
    /// The `i`th argument, above the saved frame pointer and return address.
    Param(u32),
    /// The `k`th word below the frame pointer.
    Local(u32),
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Param(i) => write!(f, "dword [ebp+{}]", 8 + 4 * i),
            Slot::Local(k) => write!(f, "dword [ebp-{}]", 4 * (k + 1)),
        }
    }
}

/// Local storage of one routine. Named bindings keep their slot for the whole routine;
/// hidden temporaries are recycled once released.
#[derive(Clone, Debug, Default)]
pub struct Frame {
    words: u32,
    free: Vec<u32>,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn binding(&mut self) -> Slot {
        self.fresh()
    }

    pub fn temp(&mut self) -> Slot {
        match self.free.pop() {
            Some(k) => Slot::Local(k),
            None => self.fresh(),
        }
    }

    pub fn release(&mut self, slot: Slot) {
        if let Slot::Local(k) = slot {
            debug_assert!(!self.free.contains(&k));
            self.free.push(k);
        }
    }

    /// Bytes to reserve below `ebp`.
    pub fn size(&self) -> u32 {
        self.words * 4
    }

    fn fresh(&mut self) -> Slot {
        let k = self.words;
        self.words += 1;
        Slot::Local(k)
    }
}

#![forbid(unsafe_code)]

use toy_ast::Span;

use crate::error::SemanticError;
use crate::kinds::ValueKind;
use crate::scope::Scopes;

/// Lifecycle of a binding. Only heap kinds ever leave `Owned`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// The binding holds a live value it is responsible for.
    Owned,
    /// The value was handed to another binding, a callee, an array or the caller.
    Moved,
    /// The value was released through `free_str` / `free_array`.
    Freed,
}

impl LifecycleState {
    pub fn display(&self) -> &'static str {
        match self {
            LifecycleState::Owned => "owned",
            LifecycleState::Moved => "moved",
            LifecycleState::Freed => "freed",
        }
    }
}

#[derive(Clone, Debug)]
pub struct OwnershipBinding {
    pub name: String,
    pub kind: ValueKind,
    pub state: LifecycleState,
    pub defined_at: Span,
    /// Where the binding was last moved or freed.
    pub changed_at: Option<Span>,
}

impl OwnershipBinding {
    pub fn new(name: String, kind: ValueKind, span: Span) -> Self {
        OwnershipBinding {
            name,
            kind,
            state: LifecycleState::Owned,
            defined_at: span,
            changed_at: None,
        }
    }

    /// Owns a heap value nobody has taken over yet.
    pub fn holds_live_heap(&self) -> bool {
        self.kind.is_heap() && self.state == LifecycleState::Owned
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViolationKind {
    UseAfterMove,
    UseAfterFree,
    DoubleFree,
    ReleaseOfMoved,
    /// Unknown name, or read before any `var` bound it.
    Uninitialized,
    /// Releasing a literal, an Int or anything else that owns nothing.
    ReleaseNonOwning,
    KindMismatch,
}

#[derive(Clone, Debug)]
pub struct OwnershipViolation {
    pub binding_name: String,
    pub error_kind: ViolationKind,
    pub span: Span,
    /// Where the binding was moved or freed, if that is what went wrong.
    pub previous: Option<Span>,
    pub message: String,
}

impl From<OwnershipViolation> for SemanticError {
    fn from(v: OwnershipViolation) -> Self {
        SemanticError {
            message: v.message,
            span: v.span,
        }
    }
}

/// Result of `var(name, ..)` against the current scopes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Assignment {
    /// The binding still owned a heap value, which must be released before the store.
    pub releases_previous: bool,
}

/// Ownership state of every binding visible in one routine (a function clause path
/// or the entry routine).
#[derive(Clone, Debug, Default)]
pub struct OwnershipContext {
    scopes: Scopes<OwnershipBinding>,
}

impl OwnershipContext {
    pub fn new() -> Self {
        OwnershipContext {
            scopes: Scopes::new(),
        }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push();
    }

    /// Leaves the innermost block, returning the bindings it introduced.
    pub fn pop_scope(&mut self) -> Vec<OwnershipBinding> {
        self.scopes.pop().into_iter().map(|(_, b)| b).collect()
    }

    pub fn define_binding(&mut self, name: &str, kind: ValueKind, span: Span) {
        self.scopes
            .declare(name, OwnershipBinding::new(name.to_string(), kind, span));
    }

    pub fn lookup(&self, name: &str) -> Option<&OwnershipBinding> {
        self.scopes.get(name)
    }

    /// `var(name, value)`: update the visible binding or introduce it innermost.
    pub fn assign(&mut self, name: &str, kind: ValueKind, span: Span) -> Assignment {
        let fresh = OwnershipBinding::new(name.to_string(), kind, span);
        match self.scopes.assign(name, fresh) {
            Some(previous) => Assignment {
                releases_previous: previous.holds_live_heap(),
            },
            None => Assignment {
                releases_previous: false,
            },
        }
    }

    /// Record a read of a binding. Does not change its state.
    pub fn record_use(
        &self,
        name: &str,
        span: Span,
    ) -> Result<&OwnershipBinding, OwnershipViolation> {
        let Some(binding) = self.scopes.get(name) else {
            return Err(OwnershipViolation {
                binding_name: name.to_string(),
                error_kind: ViolationKind::Uninitialized,
                span,
                previous: None,
                message: format!("binding '{name}' is not initialized in this scope"),
            });
        };
        match binding.state {
            LifecycleState::Owned => Ok(binding),
            LifecycleState::Moved => Err(OwnershipViolation {
                binding_name: name.to_string(),
                error_kind: ViolationKind::UseAfterMove,
                span,
                previous: binding.changed_at,
                message: format!("binding '{name}' used after move"),
            }),
            LifecycleState::Freed => Err(OwnershipViolation {
                binding_name: name.to_string(),
                error_kind: ViolationKind::UseAfterFree,
                span,
                previous: binding.changed_at,
                message: format!("binding '{name}' used after free"),
            }),
        }
    }

    /// Record a transfer of ownership. Non-heap bindings are only read.
    pub fn record_move(&mut self, name: &str, span: Span) -> Result<(), OwnershipViolation> {
        let is_heap = self.record_use(name, span)?.kind.is_heap();
        if is_heap {
            if let Some(binding) = self.scopes.get_mut(name) {
                binding.state = LifecycleState::Moved;
                binding.changed_at = Some(span);
            }
        }
        Ok(())
    }

    /// Record `free_str(name)` / `free_array(name)`.
    pub fn record_release(
        &mut self,
        name: &str,
        expected: ValueKind,
        span: Span,
    ) -> Result<(), OwnershipViolation> {
        let Some(binding) = self.scopes.get_mut(name) else {
            return Err(OwnershipViolation {
                binding_name: name.to_string(),
                error_kind: ViolationKind::Uninitialized,
                span,
                previous: None,
                message: format!("binding '{name}' is not initialized in this scope"),
            });
        };

        if !binding.kind.is_heap() {
            return Err(OwnershipViolation {
                binding_name: name.to_string(),
                error_kind: ViolationKind::ReleaseNonOwning,
                span,
                previous: None,
                message: format!(
                    "cannot release '{name}': a {} owns no heap value",
                    binding.kind
                ),
            });
        }
        if binding.kind != expected {
            return Err(OwnershipViolation {
                binding_name: name.to_string(),
                error_kind: ViolationKind::KindMismatch,
                span,
                previous: None,
                message: format!(
                    "cannot release '{name}' as {expected}: it holds a {}",
                    binding.kind
                ),
            });
        }

        match binding.state {
            LifecycleState::Owned => {
                binding.state = LifecycleState::Freed;
                binding.changed_at = Some(span);
                Ok(())
            }
            LifecycleState::Moved => Err(OwnershipViolation {
                binding_name: name.to_string(),
                error_kind: ViolationKind::ReleaseOfMoved,
                span,
                previous: binding.changed_at,
                message: format!("cannot release '{name}': it was moved"),
            }),
            LifecycleState::Freed => Err(OwnershipViolation {
                binding_name: name.to_string(),
                error_kind: ViolationKind::DoubleFree,
                span,
                previous: binding.changed_at,
                message: format!("double free of '{name}'"),
            }),
        }
    }

    /// Every visible binding, outermost first.
    pub fn bindings(&self) -> impl Iterator<Item = &OwnershipBinding> {
        self.scopes.iter().map(|(_, b)| b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toy_ast::span;

    #[test]
    fn move_then_use_is_rejected() {
        let mut ctx = OwnershipContext::new();
        ctx.define_binding("s", ValueKind::String, span(0, 1));
        ctx.record_move("s", span(5, 1)).unwrap();

        let err = ctx.record_use("s", span(9, 1)).unwrap_err();
        assert_eq!(err.error_kind, ViolationKind::UseAfterMove);
        assert_eq!(err.previous, Some(span(5, 1)));
    }

    #[test]
    fn scalars_never_leave_owned() {
        let mut ctx = OwnershipContext::new();
        ctx.define_binding("n", ValueKind::Int, span(0, 1));
        ctx.record_move("n", span(2, 1)).unwrap();
        ctx.record_move("n", span(4, 1)).unwrap();
        assert_eq!(ctx.lookup("n").unwrap().state, LifecycleState::Owned);
    }

    #[test]
    fn release_transitions() {
        let mut ctx = OwnershipContext::new();
        ctx.define_binding("a", ValueKind::Array, span(0, 1));
        ctx.define_binding("n", ValueKind::Int, span(0, 1));

        let err = ctx
            .record_release("a", ValueKind::String, span(1, 1))
            .unwrap_err();
        assert_eq!(err.error_kind, ViolationKind::KindMismatch);

        ctx.record_release("a", ValueKind::Array, span(2, 1)).unwrap();
        let err = ctx
            .record_release("a", ValueKind::Array, span(3, 1))
            .unwrap_err();
        assert_eq!(err.error_kind, ViolationKind::DoubleFree);

        let err = ctx.record_use("a", span(4, 1)).unwrap_err();
        assert_eq!(err.error_kind, ViolationKind::UseAfterFree);

        let err = ctx
            .record_release("n", ValueKind::Array, span(5, 1))
            .unwrap_err();
        assert_eq!(err.error_kind, ViolationKind::ReleaseNonOwning);

        let err = ctx
            .record_release("ghost", ValueKind::Array, span(6, 1))
            .unwrap_err();
        assert_eq!(err.error_kind, ViolationKind::Uninitialized);
    }

    #[test]
    fn releasing_a_moved_binding_is_rejected() {
        let mut ctx = OwnershipContext::new();
        ctx.define_binding("s", ValueKind::String, span(0, 1));
        ctx.record_move("s", span(1, 1)).unwrap();
        let err = ctx
            .record_release("s", ValueKind::String, span(2, 1))
            .unwrap_err();
        assert_eq!(err.error_kind, ViolationKind::ReleaseOfMoved);
    }

    #[test]
    fn rebinding_an_owned_heap_value_releases_it_first() {
        let mut ctx = OwnershipContext::new();
        assert!(!ctx.assign("s", ValueKind::String, span(0, 1)).releases_previous);
        assert!(ctx.assign("s", ValueKind::String, span(1, 1)).releases_previous);

        ctx.record_move("s", span(2, 1)).unwrap();
        let revived = ctx.assign("s", ValueKind::String, span(3, 1));
        assert!(!revived.releases_previous);
        assert_eq!(ctx.lookup("s").unwrap().state, LifecycleState::Owned);
    }

    #[test]
    fn block_scoped_bindings_disappear() {
        let mut ctx = OwnershipContext::new();
        ctx.push_scope();
        ctx.assign("t", ValueKind::Array, span(0, 1));
        let popped = ctx.pop_scope();
        assert_eq!(popped.len(), 1);
        assert!(popped[0].holds_live_heap());
        assert!(ctx.lookup("t").is_none());
    }
}

//! Nesting-aware event suppression.
//!
//! A [`SuppressionStack`] holds the "should this emit" flag for a multi-step
//! programmatic mutation. Callers open a [`SuppressionScope`] with the value
//! they want in force; the scope restores the previous value when dropped,
//! whichever way the enclosing code exits.

use std::cell::RefCell;

use crate::error::{HubError, Result};

#[derive(Debug, Default)]
pub struct SuppressionStack {
    values: RefCell<Vec<bool>>,
}

impl SuppressionStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stack seeded with a base value that is never popped by scopes.
    pub fn with_initial(initial: bool) -> Self {
        Self {
            values: RefCell::new(vec![initial]),
        }
    }

    pub fn push(&self, value: bool) {
        self.values.borrow_mut().push(value);
    }

    pub fn pop(&self) -> Result<bool> {
        self.values
            .borrow_mut()
            .pop()
            .ok_or(HubError::StackUnderflow)
    }

    pub fn peek(&self, default_if_empty: bool) -> bool {
        self.top().unwrap_or(default_if_empty)
    }

    pub fn top(&self) -> Option<bool> {
        self.values.borrow().last().copied()
    }

    pub fn depth(&self) -> usize {
        self.values.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.borrow().is_empty()
    }

    /// Pushes `value` and returns a guard that pops it on drop.
    pub fn scope(&self, value: bool) -> SuppressionScope<'_> {
        self.push(value);
        SuppressionScope {
            stack: self,
            depth: self.depth(),
        }
    }
}

/// Guard returned by [`SuppressionStack::scope`].
#[derive(Debug)]
#[must_use = "dropping the scope immediately restores the previous value"]
pub struct SuppressionScope<'a> {
    stack: &'a SuppressionStack,
    depth: usize,
}

impl SuppressionScope<'_> {
    /// Value pushed by this scope.
    pub fn value(&self) -> bool {
        self.stack
            .values
            .borrow()
            .get(self.depth - 1)
            .copied()
            .unwrap_or(false)
    }

    /// True when no other scope was open when this one was created.
    pub fn is_outermost(&self, base_depth: usize) -> bool {
        self.depth == base_depth + 1
    }
}

impl Drop for SuppressionScope<'_> {
    fn drop(&mut self) {
        // Scopes nest strictly; anything else is a bookkeeping bug.
        if !std::thread::panicking() {
            debug_assert_eq!(
                self.stack.depth(),
                self.depth,
                "suppression scopes closed out of order"
            );
        }
        let _ = self.stack.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peek_falls_back_when_empty() {
        let stack = SuppressionStack::new();
        assert!(stack.peek(true));
        assert!(!stack.peek(false));
        stack.push(false);
        assert!(!stack.peek(true));
    }

    #[test]
    fn pop_on_empty_is_underflow() {
        let stack = SuppressionStack::new();
        assert_eq!(stack.pop(), Err(HubError::StackUnderflow));
    }

    #[test]
    fn scopes_restore_previous_value() {
        let stack = SuppressionStack::with_initial(true);
        {
            let outer = stack.scope(false);
            assert!(!stack.peek(true));
            assert!(outer.is_outermost(1));
            {
                let inner = stack.scope(true);
                assert!(inner.value());
                assert!(!inner.is_outermost(1));
                assert_eq!(stack.depth(), 3);
            }
            assert!(!stack.peek(true));
        }
        assert_eq!(stack.depth(), 1);
        assert!(stack.peek(false));
    }

    #[test]
    fn scope_pops_on_early_return() {
        fn fallible(stack: &SuppressionStack, fail: bool) -> Result<()> {
            let _scope = stack.scope(false);
            if fail {
                return Err(HubError::UnknownValue);
            }
            Ok(())
        }

        let stack = SuppressionStack::with_initial(true);
        assert!(fallible(&stack, true).is_err());
        assert_eq!(stack.depth(), 1);
        assert!(fallible(&stack, false).is_ok());
        assert_eq!(stack.depth(), 1);
    }
}

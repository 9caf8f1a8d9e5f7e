//! Multicast notification channel.

use std::fmt;

/// Handle returned by [`Signal::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u32);

type Listener<E> = Box<dyn FnMut(&E)>;

/// Listeners are called synchronously, in subscription order.
pub struct Signal<E> {
    next_id: u32,
    listeners: Vec<(SubscriptionId, Listener<E>)>,
}

impl<E> Signal<E> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            listeners: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&E) + 'static) -> SubscriptionId {
        self.subscribe_boxed(Box::new(listener))
    }

    pub fn subscribe_boxed(&mut self, listener: Box<dyn FnMut(&E)>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.listeners.push((id, listener));
        id
    }

    /// Returns `false` if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        match self.listeners.iter().position(|(sub, _)| *sub == id) {
            Some(pos) => {
                self.listeners.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn emit(&mut self, event: &E) {
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl<E> Default for Signal<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for Signal<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn emits_in_subscription_order() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut signal = Signal::<u32>::new();

        let first = Rc::clone(&seen);
        signal.subscribe(move |v| first.borrow_mut().push(("first", *v)));
        let second = Rc::clone(&seen);
        signal.subscribe(move |v| second.borrow_mut().push(("second", *v)));

        signal.emit(&7);
        assert_eq!(*seen.borrow(), vec![("first", 7), ("second", 7)]);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let count = Rc::new(RefCell::new(0));
        let mut signal = Signal::<()>::new();
        let counter = Rc::clone(&count);
        let id = signal.subscribe(move |_| *counter.borrow_mut() += 1);

        signal.emit(&());
        assert!(signal.unsubscribe(id));
        assert!(!signal.unsubscribe(id));
        signal.emit(&());

        assert_eq!(*count.borrow(), 1);
        assert!(signal.is_empty());
    }
}

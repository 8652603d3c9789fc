//! Index-linked FIFO queues.
//!
//! Links live in a slab indexed by buffer number, so a buffer can only ever be
//! linked into one queue: pushing an already linked index is a bug and asserts.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Link {
    /// In no queue.
    Unlinked,
    /// In a queue, followed by `next`.
    Linked { next: Option<u16> },
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Queue {
    head: Option<u16>,
    tail: Option<u16>,
    len: usize,
}

impl Queue {
    #[must_use]
    #[inline]
    pub const fn new() -> Self {
        Self {
            head: None,
            tail: None,
            len: 0,
        }
    }

    #[must_use]
    #[inline]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn push_back(&mut self, links: &mut [Link], index: u16) {
        assert_eq!(
            links[usize::from(index)],
            Link::Unlinked,
            "buffer {index} is already queued"
        );
        links[usize::from(index)] = Link::Linked { next: None };

        match self.tail {
            Some(tail) => links[usize::from(tail)] = Link::Linked { next: Some(index) },
            None => self.head = Some(index),
        }
        self.tail = Some(index);
        self.len += 1;
    }

    pub fn pop_front(&mut self, links: &mut [Link]) -> Option<u16> {
        let head = self.head?;
        let Link::Linked { next } = links[usize::from(head)] else {
            unreachable!("queue head {head} is unlinked");
        };
        links[usize::from(head)] = Link::Unlinked;

        self.head = next;
        if next.is_none() {
            self.tail = None;
        }
        self.len -= 1;
        Some(head)
    }

    /// Walks the queue from head to tail.
    pub fn iter<'a>(&self, links: &'a [Link]) -> impl Iterator<Item = u16> + 'a {
        core::iter::successors(self.head, move |&index| match links[usize::from(index)] {
            Link::Linked { next } => next,
            Link::Unlinked => None,
        })
    }
}

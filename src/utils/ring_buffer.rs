/// Fixed-capacity FIFO. Once full, each push overwrites the oldest entry.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    buf: Vec<T>,
    head: usize, // index of the oldest entry once the buffer is full
    capacity: usize,
}

impl<T> RingBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buf: Vec::with_capacity(capacity),
            head: 0,
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Appends `value`, returning the evicted entry when the buffer was full.
    pub fn push(&mut self, value: T) -> Option<T> {
        if self.buf.len() < self.capacity {
            self.buf.push(value);
            return None;
        }
        let evicted = std::mem::replace(&mut self.buf[self.head], value);
        self.head = (self.head + 1) % self.capacity;
        Some(evicted)
    }

    pub fn last(&self) -> Option<&T> {
        if self.buf.is_empty() {
            return None;
        }
        let idx = (self.head + self.buf.len() - 1) % self.buf.len();
        self.buf.get(idx)
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        let len = self.buf.len();
        (0..len).map(move |i| &self.buf[(self.head + i) % len])
    }

    pub fn clear(&mut self) {
        self.buf.clear();
        self.head = 0;
    }
}

impl<T: Clone> RingBuffer<T> {
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_the_last_capacity_values_in_push_order() {
        let mut ring = RingBuffer::new(100);
        for i in 0..250 {
            ring.push(i);
            assert!(ring.len() <= 100);
        }
        assert_eq!(ring.len(), 100);
        assert_eq!(ring.to_vec(), (150..250).collect::<Vec<_>>());
        assert_eq!(ring.last(), Some(&249));
    }

    #[test]
    fn push_reports_evicted_oldest() {
        let mut ring = RingBuffer::new(2);
        assert_eq!(ring.push("a"), None);
        assert_eq!(ring.push("b"), None);
        assert_eq!(ring.push("c"), Some("a"));
        assert_eq!(ring.push("d"), Some("b"));
        assert_eq!(ring.to_vec(), vec!["c", "d"]);
    }

    #[test]
    fn empty_buffer() {
        let mut ring: RingBuffer<u8> = RingBuffer::new(3);
        assert!(ring.is_empty());
        assert_eq!(ring.last(), None);
        ring.push(1);
        ring.clear();
        assert_eq!(ring.iter().count(), 0);
    }
}

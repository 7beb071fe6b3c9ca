/// Two equally-sized buffers alternating as read source and write destination.
///
/// `current()` is the source of the next pass and `other()` its destination. A
/// pass writes `other()` and then calls `swap()`, so after any number of passes
/// `current()` holds the latest result.
#[derive(Debug)]
pub struct PingPong<T> {
    slots: [T; 2],
    front: usize,
    swaps: u32,
}

impl<T> PingPong<T> {
    /// `initial` becomes `current()`.
    pub fn new(initial: T, scratch: T) -> Self {
        Self {
            slots: [initial, scratch],
            front: 0,
            swaps: 0,
        }
    }

    pub fn current(&self) -> &T {
        &self.slots[self.front]
    }

    pub fn other(&self) -> &T {
        &self.slots[1 - self.front]
    }

    pub fn swap(&mut self) {
        self.front = 1 - self.front;
        self.swaps += 1;
    }

    /// Number of swaps so far (one per completed pass).
    pub fn swaps(&self) -> u32 {
        self.swaps
    }

    /// Consumes the pair, returning `(current, other)`.
    pub fn into_parts(self) -> (T, T) {
        let [a, b] = self.slots;
        if self.front == 0 { (a, b) } else { (b, a) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swap_alternates_roles() {
        let mut pp = PingPong::new("seed", "scratch");
        assert_eq!((*pp.current(), *pp.other()), ("seed", "scratch"));
        pp.swap();
        assert_eq!((*pp.current(), *pp.other()), ("scratch", "seed"));
        pp.swap();
        assert_eq!(*pp.current(), "seed");
        assert_eq!(pp.swaps(), 2);
    }

    #[test]
    fn odd_pass_count_ends_on_scratch() {
        let mut pp = PingPong::new(0, 1);
        for _ in 0..7 {
            pp.swap();
        }
        assert_eq!(pp.into_parts(), (1, 0));
    }
}

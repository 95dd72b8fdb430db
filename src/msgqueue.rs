use crate::memory::{MHAlloc, MHRawArray};
use crate::message::MHDeferred;

//

fn wrap_inc(x: usize, bound: usize) -> usize
{
    let y = x + 1;
    if y < bound {y} else {0}
}

fn wrap_diff(x: usize, y: usize, bound: usize) -> usize
{
    if x >= y {
        x - y
    }
    else {
        x + (bound - y)
    }
}

//

/// Fixed-capacity message FIFO, typically holding messages deferred by state machine hooks
pub struct MHMsgQueue<'a, M>
{
    mem: MHRawArray<'a, Option<M>>,
    wr_idx: usize,
    rd_idx: usize
}

impl<'a, M> MHMsgQueue<'a, M>
{
    /// Creates a queue.
    /// * `alloc` - memory block allocator the entries are taken from.
    /// * `capacity` - number of messages the queue can hold.
    pub fn new(alloc: &mut MHAlloc<'a>, capacity: usize) -> MHMsgQueue<'a, M>
    {
        MHMsgQueue {
            // one entry stays vacant to tell full from empty
            mem: alloc.array(capacity + 1, |_| None),
            wr_idx: 0,
            rd_idx: 0
        }
    }

    /// Gets if there is an available message entry.
    /// * Returns the number of available message entries.
    pub fn available(&self) -> usize
    {
        wrap_diff(self.wr_idx, self.rd_idx, self.mem.len())
    }

    /// Gets if there is a vacant message entry.
    /// * Returns the number of vacant message entries.
    pub fn vacant(&self) -> usize
    {
        wrap_diff(self.rd_idx, wrap_inc(self.wr_idx, self.mem.len()), self.mem.len())
    }

    pub fn capacity(&self) -> usize
    {
        self.mem.len() - 1
    }

    /// Appends a message.
    /// * Returns the message back in `Err` if the queue is full.
    pub fn push(&mut self, msg: M) -> Result<(), M>
    {
        let curr_wr_idx = self.wr_idx;
        let next_wr_idx = wrap_inc(curr_wr_idx, self.mem.len());

        if next_wr_idx == self.rd_idx {
            return Err(msg);
        }

        self.mem.replace(curr_wr_idx, Some(msg));
        self.wr_idx = next_wr_idx;

        Ok(())
    }

    /// Takes the oldest message.
    pub fn pop(&mut self) -> Option<M>
    {
        let curr_rd_idx = self.rd_idx;

        if curr_rd_idx == self.wr_idx {
            return None;
        }

        self.rd_idx = wrap_inc(curr_rd_idx, self.mem.len());

        self.mem.replace(curr_rd_idx, None)
    }

    /// Refers to the oldest message.
    pub fn front(&self) -> Option<&M>
    {
        if self.rd_idx == self.wr_idx {
            None
        }
        else {
            self.mem.get(self.rd_idx).as_ref()
        }
    }

    /// Drops every message.
    pub fn clear(&mut self)
    {
        while self.pop().is_some() {}
    }
}

impl<M> Drop for MHMsgQueue<'_, M>
{
    fn drop(&mut self)
    {
        self.clear();
    }
}

impl<M> MHDeferred<M> for MHMsgQueue<'_, M>
{
    fn defer(&mut self, msg: M) -> Result<(), M>
    {
        self.push(msg)
    }

    fn recall(&mut self) -> Option<M>
    {
        self.pop()
    }
}

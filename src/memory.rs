use core::mem::{MaybeUninit, size_of, align_of};
use core::marker::PhantomData;

use crate::bk_assert;

//

fn align_up<A>(x: usize) -> usize
{
    let align = align_of::<A>();
    let y = (x + align - 1) / align;
    let y = y * align;
    y
}

//

/// Memory block from which timers, queues and buses take their storage
pub struct MHMemBlk<B>(MaybeUninit<B>);

impl<B> MHMemBlk<B>
{
    /// Reserves a memory block.
    /// * Any type `B` specifies a size of the memory block. Typically use `[u8; N]` for `N` bytes.
    pub const fn new() -> MHMemBlk<B>
    {
        MHMemBlk(MaybeUninit::<B>::uninit())
    }

    fn size(&self) -> usize
    {
        size_of::<B>()
    }

    fn head(&mut self) -> usize
    {
        self.0.as_mut_ptr() as usize
    }
}

//

/// Fixed-length array carved from a memory block.
/// Elements are never dropped by the array itself.
pub struct MHRawArray<'a, V>
{
    head: *mut V,
    len: usize,
    phantom: PhantomData<&'a mut V>
}

// The array exclusively owns its region of the block.
unsafe impl<V: Send> Send for MHRawArray<'_, V> {}

impl<V> MHRawArray<'_, V>
{
    fn ptr(&self, i: usize) -> *mut V
    {
        bk_assert!(i < self.len, "index {} out of array length {}", i, self.len);

        unsafe { self.head.add(i) }
    }

    pub(crate) fn get<I>(&self, i: I) -> &V
    where I: Into<usize>
    {
        unsafe { &*self.ptr(i.into()) }
    }

    pub(crate) fn get_mut<I>(&mut self, i: I) -> &mut V
    where I: Into<usize>
    {
        unsafe { &mut *self.ptr(i.into()) }
    }

    pub(crate) fn replace<I>(&mut self, i: I, v: V) -> V
    where I: Into<usize>
    {
        let ptr = self.ptr(i.into());

        unsafe { core::ptr::replace(ptr, v) }
    }

    pub(crate) fn swap<I>(&mut self, i0: I, i1: I)
    where I: Into<usize>
    {
        let p0 = self.ptr(i0.into());
        let p1 = self.ptr(i1.into());

        if p0 != p1 {
            unsafe { core::ptr::swap(p0, p1); }
        }
    }

    pub(crate) fn len(&self) -> usize
    {
        self.len
    }
}

//

/// Bump allocator over a `MHMemBlk`
pub struct MHAlloc<'a>
{
    cur_pos: usize,
    end_cap: usize,
    phantom: PhantomData<&'a mut ()>
}

impl<'a> MHAlloc<'a>
{
    /// Starts allocating from `mem`.
    pub fn new<B>(mem: &'a mut MHMemBlk<B>) -> MHAlloc<'a>
    {
        MHAlloc {
            cur_pos: mem.head(),
            end_cap: mem.head() + mem.size(),
            phantom: PhantomData
        }
    }

    /// Bytes left in the block, ignoring alignment padding.
    pub fn remaining(&self) -> usize
    {
        self.end_cap - self.cur_pos
    }

    /// Takes an array of `len` elements, each one written by `init(index)`.
    /// * Panics if the block is too short.
    pub(crate) fn array<V, F>(&mut self, len: usize, mut init: F) -> MHRawArray<'a, V>
    where F: FnMut(usize) -> V
    {
        let size = size_of::<V>() * len;

        let p = align_up::<V>(self.cur_pos);
        let e = p + size;

        assert!(e <= self.end_cap,
                "{} bytes shortage of memory block", e - self.end_cap);

        self.cur_pos = e;

        let head = p as *mut V;
        for i in 0..len {
            unsafe { head.add(i).write(init(i)); }
        }

        MHRawArray {
            head,
            len,
            phantom: PhantomData
        }
    }
}

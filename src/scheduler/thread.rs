/*
 * Thread Objects
 *
 * Each thread owns a single 4 KiB kernel stack page; the control block
 * itself lives in the scheduler's roster. A magic value in the control
 * block plus a canary word at the bottom of the stack page detect the
 * two classic corruptions: a stale/dangling thread reference and a
 * kernel stack overflow (the stack grows down toward the canary).
 *
 * Threads move through four states:
 *
 *   Ready -> Running -> Blocked -> Ready ...
 *                    -> Dying (roster entry reaped after the switch)
 *
 * A thread on the ready queue is Ready; a thread on a wait queue or
 * the sleep queue is Blocked (with a nonzero wakeup tick when
 * sleeping). The queues are disjoint, so a single membership at a time
 * is an invariant, not a convention.
 */

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use core::ptr::NonNull;

use super::context::InterruptContext;
use super::fixed_point::Fixed;
use crate::fs::File;
use crate::memory::{self, PAGE_SIZE, PageFlags};
use crate::sync::lock::LockInner;
use crate::userprog::descriptor::DescriptorTable;
use crate::userprog::process::Pcb;

/// Magic value stored in every live control block.
pub const THREAD_MAGIC: u32 = 0x7468_6264;

/// Canary written at the lowest word of each stack page.
const STACK_CANARY: u32 = 0xCD15_2A5E;

/// Entry function for a new thread; `aux` is an opaque argument.
pub type ThreadFunc = fn(usize);

/// Thread identifier. Ids are unique and monotonically assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ThreadId(pub i32);

/// Error value for thread/process ids.
pub const TID_ERROR: ThreadId = ThreadId(-1);

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Thread({})", self.0)
    }
}

/// Thread life-cycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadState {
    Running,
    Ready,
    Blocked,
    Dying,
}

/// One 4 KiB kernel stack page, freed when the thread is reaped.
pub struct StackPage(NonNull<u8>);

// The page is exclusively owned by its thread.
unsafe impl Send for StackPage {}

impl StackPage {
    /// Allocate a zeroed stack page with the canary planted at the
    /// bottom (lowest address, which the stack grows toward).
    pub fn alloc() -> Option<StackPage> {
        let page = memory::alloc_page(PageFlags::ZERO)?;
        unsafe { *(page.as_ptr() as *mut u32) = STACK_CANARY };
        Some(StackPage(page))
    }

    /// Address one past the highest usable byte.
    pub fn top(&self) -> u64 {
        self.0.as_ptr() as u64 + PAGE_SIZE as u64
    }

    /// Whether the canary is intact.
    pub fn canary_intact(&self) -> bool {
        unsafe { *(self.0.as_ptr() as *const u32) == STACK_CANARY }
    }
}

impl Drop for StackPage {
    fn drop(&mut self) {
        unsafe { memory::free_page(self.0) };
    }
}

/// Per-thread control block.
pub struct Thread {
    pub id: ThreadId,
    pub name: heapless::String<16>,
    pub state: ThreadState,

    /// Priority the thread asked for; never raised by donation.
    pub base_priority: i32,
    /// Priority used for every scheduling decision; >= base_priority.
    pub priority: i32,
    pub is_idle: bool,

    /// None only for the boot thread, which runs on the boot stack.
    pub stack: Option<StackPage>,
    pub context: InterruptContext,
    /// Taken by the entry trampoline on first dispatch.
    pub entry: Option<(ThreadFunc, usize)>,

    /// Absolute wakeup tick; 0 when not sleeping.
    pub wakeup_tick: i64,

    /// The lock this thread is currently blocked on, if any.
    pub waiting_on: Option<Arc<LockInner>>,
    /// Locks this thread currently holds (donation sources).
    pub held_locks: Vec<Arc<LockInner>>,

    /// MLFQS accounting.
    pub nice: i32,
    pub recent_cpu: Fixed,

    /// User-process extension.
    pub pcb: Option<Arc<Pcb>>,
    pub children: Vec<Arc<Pcb>>,
    pub descriptors: DescriptorTable,
    pub executable: Option<File>,

    pub magic: u32,
}

impl Thread {
    /// Build a control block. The caller decides the initial state and
    /// whether the thread owns a stack page.
    pub fn new(id: ThreadId, name: &str, priority: i32, stack: Option<StackPage>) -> Thread {
        let mut short_name = heapless::String::new();
        for c in name.chars().take(16) {
            if short_name.push(c).is_err() {
                break;
            }
        }
        Thread {
            id,
            name: short_name,
            state: ThreadState::Blocked,
            base_priority: priority,
            priority,
            is_idle: false,
            stack,
            context: InterruptContext::default(),
            entry: None,
            wakeup_tick: 0,
            waiting_on: None,
            held_locks: Vec::new(),
            nice: 0,
            recent_cpu: Fixed::ZERO,
            pcb: None,
            children: Vec::new(),
            descriptors: DescriptorTable::new(),
            executable: None,
            magic: THREAD_MAGIC,
        }
    }

    /// Panic if this control block is corrupt or its stack overflowed.
    pub fn assert_alive(&self) {
        assert!(self.magic == THREAD_MAGIC, "thread {} magic corrupted", self.id);
        if let Some(stack) = &self.stack {
            assert!(stack.canary_intact(), "thread {} ({}) kernel stack overflow", self.id, self.name);
        }
    }
}

impl fmt::Debug for Thread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Thread")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("state", &self.state)
            .field("priority", &self.priority)
            .field("base_priority", &self.base_priority)
            .finish()
    }
}

/// Snapshot of one thread for diagnostics.
#[derive(Debug, Clone)]
pub struct ThreadStats {
    pub id: ThreadId,
    pub name: alloc::string::String,
    pub state: ThreadState,
    pub priority: i32,
}

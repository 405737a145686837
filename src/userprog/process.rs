/*
 * Process Lifecycle and the PCB
 *
 * A user process is a thread with a process control block attached.
 * The PCB is the only channel between parent and child: it records the
 * child's pid, exit state, and two rendezvous semaphores -
 *
 * - load_done: the parent blocks here after spawning the child; the
 *   child signals once its executable either loaded (pid = its tid) or
 *   failed (pid = -1)
 * - exit_done: the waiting parent blocks here; the child signals on
 *   its way out after depositing the exit code
 *
 * Ownership: the PCB is a shared handle held by the parent (children
 * list) and the child (its thread). Whichever side finishes last drops
 * the final reference, which covers the orphan cases symmetrically:
 * a parent that exits early just drops its list, and a child whose
 * parent never waits frees the block on its own exit path. The command
 * line lives inside the PCB, so it outlives the child's use of it.
 */

use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;
use core::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use crate::scheduler::{self, PRI_DEFAULT, TID_ERROR};
use crate::sync::Semaphore;
use crate::userprog::loader;

/// Pid value reported for a child whose load failed.
pub const PID_ERROR: i32 = TID_ERROR.0;

/// Process control block shared between parent and child.
pub struct Pcb {
    /// Child pid; PID_ERROR until the load rendezvous completes.
    pid: AtomicI32,
    /// The command line that started the child. Owned here so the
    /// child can read its name regardless of what the parent does.
    pub cmdline: String,
    /// Set once a parent committed to waiting; a second wait fails.
    waited: AtomicBool,
    /// Set when the child has terminated and the exit code is valid.
    exited: AtomicBool,
    exit_code: AtomicI32,
    /// Load success/failure rendezvous.
    pub load_done: Semaphore,
    /// Exit rendezvous.
    pub exit_done: Semaphore,
}

impl Pcb {
    fn new(cmdline: &str) -> Pcb {
        Pcb {
            pid: AtomicI32::new(PID_ERROR),
            cmdline: String::from(cmdline),
            waited: AtomicBool::new(false),
            exited: AtomicBool::new(false),
            exit_code: AtomicI32::new(0),
            load_done: Semaphore::new(0),
            exit_done: Semaphore::new(0),
        }
    }

    pub fn pid(&self) -> i32 {
        self.pid.load(Ordering::SeqCst)
    }

    fn set_pid(&self, pid: i32) {
        self.pid.store(pid, Ordering::SeqCst);
    }

    /// Atomically claim the right to wait. Only one wait per child.
    fn try_claim_wait(&self) -> bool {
        self.waited
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn has_exited(&self) -> bool {
        self.exited.load(Ordering::SeqCst)
    }

    fn mark_exited(&self, code: i32) {
        self.exit_code.store(code, Ordering::SeqCst);
        self.exited.store(true, Ordering::SeqCst);
    }

    pub fn exit_code(&self) -> i32 {
        self.exit_code.load(Ordering::SeqCst)
    }
}

struct ExecArgs {
    pcb: Arc<Pcb>,
}

/// Start a child process running the given command line.
///
/// Allocates the PCB before the child exists, records it in the
/// caller's children list, spawns the child thread, and blocks until
/// the child reports load success or failure. Returns the child pid,
/// or -1 when the thread could not be created or the load failed.
pub fn execute(cmdline: &str) -> i32 {
    let pcb = Arc::new(Pcb::new(cmdline));
    scheduler::with_current_thread_mut(|t| t.children.push(Arc::clone(&pcb)));

    let name = cmdline.trim().split(' ').next().unwrap_or("");
    let aux = Box::into_raw(Box::new(ExecArgs {
        pcb: Arc::clone(&pcb),
    })) as usize;

    if scheduler::spawn(name, PRI_DEFAULT, start_process, aux).is_err() {
        // SAFETY: the child never ran, so the box is still ours.
        drop(unsafe { Box::from_raw(aux as *mut ExecArgs) });
        drop_child(&pcb);
        return PID_ERROR;
    }

    // Load rendezvous: the child ups this once pid is decided.
    pcb.load_done.down();

    let pid = pcb.pid();
    if pid == PID_ERROR {
        drop_child(&pcb);
    }
    pid
}

fn drop_child(pcb: &Arc<Pcb>) {
    scheduler::with_current_thread_mut(|t| {
        t.children.retain(|c| !Arc::ptr_eq(c, pcb));
    });
}

/// Entry point of every child process thread.
fn start_process(aux: usize) {
    // SAFETY: aux was produced by Box::into_raw in execute().
    let args = unsafe { Box::from_raw(aux as *mut ExecArgs) };
    let pcb = args.pcb;

    scheduler::with_current_thread_mut(|t| t.pcb = Some(Arc::clone(&pcb)));

    match loader::load(&pcb.cmdline) {
        Ok(image) => {
            scheduler::with_current_thread_mut(|t| t.executable = Some(image.executable));
            pcb.set_pid(scheduler::current_tid().0);
            pcb.load_done.up();

            let status = (image.main)(&image.args);
            exit(status);
        }
        Err(err) => {
            log::warn!("load of '{}' failed: {}", pcb.cmdline, err);
            pcb.set_pid(PID_ERROR);
            pcb.load_done.up();
            scheduler::exit_thread();
        }
    }
}

/// Wait for a direct child and collect its exit code.
///
/// Returns -1 when `pid` is not an unwaited direct child. On success
/// the child's PCB is detached from the caller's children list.
pub fn wait(pid: i32) -> i32 {
    let pcb = scheduler::with_current_thread_mut(|t| {
        t.children.iter().find(|c| c.pid() == pid).cloned()
    });
    let Some(pcb) = pcb else { return -1 };

    if !pcb.try_claim_wait() {
        return -1;
    }

    pcb.exit_done.down();
    let code = pcb.exit_code();
    drop_child(&pcb);
    code
}

/// Terminate the current user process with the given status.
///
/// Prints the mandatory exit line, closes every descriptor and the
/// write-protected executable, publishes the exit code, releases a
/// waiting parent, and takes the thread down. Every termination path -
/// a plain EXIT call, a bad user pointer, an unknown syscall number -
/// comes through here, so the exit line appears exactly once.
pub fn exit(status: i32) -> ! {
    let name = scheduler::current_name();
    crate::println!("{}: exit({})", name, status);

    let executable = scheduler::with_current_thread_mut(|t| {
        t.descriptors.clear();
        t.executable.take()
    });
    // Dropping the handle re-allows writes to the executable.
    drop(executable);

    let pcb = scheduler::with_current_thread_mut(|t| t.pcb.clone());
    if let Some(pcb) = pcb {
        pcb.mark_exited(status);
        pcb.exit_done.up();
    }

    scheduler::exit_thread();
}

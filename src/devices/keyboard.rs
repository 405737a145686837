/*
 * PS/2 Keyboard Driver
 *
 * Scancode decoding via the pc_keyboard crate. The interrupt handler is
 * a minimal top-half: read the scancode, decode, push the character
 * into an IRQ-safe ring buffer, and wake any thread blocked in
 * `input_getc`.
 *
 * The ring buffer uses only atomics so the ISR never takes a lock.
 */

use core::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use pc_keyboard::{DecodedKey, HandleControl, Keyboard, ScancodeSet1, layouts};
use spin::Mutex;

use crate::arch::x86_64::interrupts::DisableInterrupts;
use crate::arch::x86_64::pio::{Io, Pio};
use crate::scheduler::{self, ThreadId};

/// PS/2 keyboard data port
const KEYBOARD_DATA_PORT: u16 = 0x60;

/// Ring buffer capacity.
const BUFFER_SIZE: usize = 64;

static KEYBOARD_BUFFER: [AtomicU32; BUFFER_SIZE] = [const { AtomicU32::new(0) }; BUFFER_SIZE];
static BUFFER_READ_POS: AtomicUsize = AtomicUsize::new(0);
static BUFFER_WRITE_POS: AtomicUsize = AtomicUsize::new(0);
static BUFFER_COUNT: AtomicUsize = AtomicUsize::new(0);

static KEYBOARD_INIT: AtomicBool = AtomicBool::new(false);
static mut KEYBOARD_DECODER: Option<Keyboard<layouts::Us104Key, ScancodeSet1>> = None;

/// Threads blocked waiting for input. Touched only with interrupts off.
static WAITERS: Mutex<alloc::vec::Vec<ThreadId>> = Mutex::new(alloc::vec::Vec::new());

/// Initialize the keyboard decoder (called once during boot).
pub fn init() {
    unsafe {
        KEYBOARD_DECODER = Some(Keyboard::new(
            ScancodeSet1::new(),
            layouts::Us104Key,
            HandleControl::Ignore,
        ));
    }
    KEYBOARD_INIT.store(true, Ordering::SeqCst);
    log::info!("keyboard initialized");
}

fn buffer_push(ch: char) {
    let count = BUFFER_COUNT.load(Ordering::Acquire);
    if count < BUFFER_SIZE {
        let write_pos = BUFFER_WRITE_POS.load(Ordering::Acquire);
        KEYBOARD_BUFFER[write_pos].store(ch as u32, Ordering::Release);
        BUFFER_WRITE_POS.store((write_pos + 1) % BUFFER_SIZE, Ordering::Release);
        BUFFER_COUNT.store(count + 1, Ordering::Release);
    }
}

fn buffer_pop() -> Option<u8> {
    let count = BUFFER_COUNT.load(Ordering::Acquire);
    if count > 0 {
        let read_pos = BUFFER_READ_POS.load(Ordering::Acquire);
        let ch = KEYBOARD_BUFFER[read_pos].load(Ordering::Acquire) as u8;
        BUFFER_READ_POS.store((read_pos + 1) % BUFFER_SIZE, Ordering::Release);
        BUFFER_COUNT.store(count - 1, Ordering::Release);
        Some(ch)
    } else {
        None
    }
}

/// Keyboard interrupt top-half (IRQ 1). No locks, no allocation.
pub fn handle_keyboard_interrupt() {
    if !KEYBOARD_INIT.load(Ordering::Acquire) {
        return;
    }

    let scancode = Pio::<u8>::new(KEYBOARD_DATA_PORT).read();

    // The decoder is only touched here, and IRQ 1 cannot nest.
    unsafe {
        let decoder = &mut *core::ptr::addr_of_mut!(KEYBOARD_DECODER);
        if let Some(keyboard) = decoder {
            if let Ok(Some(key_event)) = keyboard.add_byte(scancode) {
                if let Some(DecodedKey::Unicode(character)) = keyboard.process_keyevent(key_event) {
                    buffer_push(character);
                    wake_waiters();
                }
            }
        }
    }
}

fn wake_waiters() {
    let woken: alloc::vec::Vec<ThreadId> = {
        let mut waiters = WAITERS.lock();
        core::mem::take(&mut *waiters)
    };
    for tid in woken {
        scheduler::unblock(tid);
    }
}

/// Read one character from the keyboard, blocking until a key arrives.
///
/// The calling thread consumes no CPU while waiting; the IRQ handler
/// wakes it when input lands in the ring buffer.
pub fn input_getc() -> u8 {
    loop {
        if let Some(ch) = buffer_pop() {
            return ch;
        }

        // Register as a waiter and deschedule. Interrupts stay off
        // from registration through the block so a keystroke between
        // the two cannot be lost.
        let _guard = DisableInterrupts::new();
        if BUFFER_COUNT.load(Ordering::Acquire) > 0 {
            continue;
        }
        WAITERS.lock().push(scheduler::current_tid());
        scheduler::block_current_and_schedule();
    }
}

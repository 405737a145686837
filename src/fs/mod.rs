/*
 * File Store
 *
 * The narrow file-system interface the syscall layer is written
 * against: create/remove/open plus per-handle read, write, length,
 * seek, tell, and write denial. Backed by a RAM store so the kernel is
 * self-contained; the interface is the contract, the store is a detail.
 *
 * Semantics follow the classic teaching file system:
 * - files have a fixed size decided at creation; writes never grow them
 * - removing an open file unlinks the name but the data survives until
 *   the last handle closes
 * - deny_write blocks writes through *any* handle until the denying
 *   handle is closed (used to protect running executables)
 *
 * Callers serialize all calls through the syscall layer's global
 * file-system lock; the store's own mutex only protects the name table
 * against kernel-internal users.
 */

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicUsize, Ordering};
use spin::Mutex;

struct Inode {
    data: Mutex<Vec<u8>>,
    /// Number of open handles currently denying writes.
    deny_write: AtomicUsize,
}

/// Name table of the RAM store.
static FILES: Mutex<BTreeMap<String, Arc<Inode>>> = Mutex::new(BTreeMap::new());

/// Announce the store; nothing to mount.
pub fn init() {
    log::info!("ram file store ready");
}

/// Create a file of exactly `initial_size` bytes. Fails when the name
/// is empty or already taken. Creation does not open the file.
pub fn create(name: &str, initial_size: u32) -> bool {
    if name.is_empty() {
        return false;
    }
    let mut files = FILES.lock();
    if files.contains_key(name) {
        return false;
    }
    files.insert(
        String::from(name),
        Arc::new(Inode {
            data: Mutex::new(vec![0; initial_size as usize]),
            deny_write: AtomicUsize::new(0),
        }),
    );
    true
}

/// Unlink a file. Open handles keep working; the data is freed when
/// the last one closes.
pub fn remove(name: &str) -> bool {
    FILES.lock().remove(name).is_some()
}

/// Open a file by name.
pub fn open(name: &str) -> Option<File> {
    let inode = FILES.lock().get(name).cloned()?;
    Some(File {
        inode,
        pos: 0,
        denying: false,
    })
}

/// An open file handle: shared inode plus a private position.
pub struct File {
    inode: Arc<Inode>,
    pos: usize,
    /// Whether this handle contributes a write denial.
    denying: bool,
}

impl File {
    /// Read from the current position. Returns the number of bytes
    /// stored in `buf` (zero at end of file).
    pub fn read(&mut self, buf: &mut [u8]) -> usize {
        let data = self.inode.data.lock();
        if self.pos >= data.len() {
            return 0;
        }
        let n = buf.len().min(data.len() - self.pos);
        buf[..n].copy_from_slice(&data[self.pos..self.pos + n]);
        self.pos += n;
        n
    }

    /// Write at the current position. Writes stop at end of file (file
    /// sizes are fixed at creation) and are refused entirely while any
    /// handle denies writes. Returns the number of bytes written.
    pub fn write(&mut self, buf: &[u8]) -> usize {
        if self.inode.deny_write.load(Ordering::SeqCst) > 0 {
            return 0;
        }
        let mut data = self.inode.data.lock();
        if self.pos >= data.len() {
            return 0;
        }
        let n = buf.len().min(data.len() - self.pos);
        data[self.pos..self.pos + n].copy_from_slice(&buf[..n]);
        self.pos += n;
        n
    }

    /// File size in bytes.
    pub fn length(&self) -> u32 {
        self.inode.data.lock().len() as u32
    }

    /// Move the position to `pos` bytes from the start.
    pub fn seek(&mut self, pos: u32) {
        self.pos = pos as usize;
    }

    /// Current position in bytes from the start.
    pub fn tell(&self) -> u32 {
        self.pos as u32
    }

    /// Deny writes to the underlying file until this handle closes.
    pub fn deny_write(&mut self) {
        if !self.denying {
            self.denying = true;
            self.inode.deny_write.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Re-allow writes previously denied through this handle.
    pub fn allow_write(&mut self) {
        if self.denying {
            self.denying = false;
            self.inode.deny_write.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl Drop for File {
    fn drop(&mut self) {
        self.allow_write();
    }
}

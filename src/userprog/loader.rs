/*
 * Program Loader
 *
 * Resolves the program named by a command line to an executable image.
 * Images are registered kernel-mode program bodies keyed by name; the
 * on-"disk" side of an installed program is a file in the RAM store,
 * which load opens and write-protects for the program's lifetime, so
 * the executable-protection path behaves exactly as it would with a
 * real binary loader behind this seam.
 */

use alloc::collections::BTreeMap;
use alloc::string::String;
use spin::Mutex;

use crate::fs;

/// A program body: receives the argument tail of the command line and
/// returns the process exit status.
pub type ProgramMain = fn(&str) -> i32;

static PROGRAMS: Mutex<BTreeMap<String, ProgramMain>> = Mutex::new(BTreeMap::new());

/// Loaded image handed to the process start path.
pub struct Image {
    pub main: ProgramMain,
    pub args: String,
    /// The open executable, writes denied until the process exits.
    pub executable: fs::File,
}

/// Register a program body and back it with a file-store entry so the
/// loader can open and write-protect "the executable".
pub fn install(name: &str, main: ProgramMain) {
    fs::create(name, 64);
    PROGRAMS.lock().insert(String::from(name), main);
}

/// Resolve a command line. The first whitespace-separated token names
/// the program; the rest is passed through as its argument string.
pub fn load(cmdline: &str) -> Result<Image, &'static str> {
    let trimmed = cmdline.trim();
    let mut parts = trimmed.splitn(2, ' ');
    let name = parts.next().unwrap_or("");
    let args = parts.next().unwrap_or("").trim();

    let main = *PROGRAMS.lock().get(name).ok_or("unknown program")?;

    let mut executable = fs::open(name).ok_or("executable missing from file store")?;
    executable.deny_write();

    Ok(Image {
        main,
        args: String::from(args),
        executable,
    })
}

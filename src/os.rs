//! OS facilities spec.md §1 treats as an external collaborator: process
//! spawning, zombie reaping, and (OpenBSD only) `pledge` (spec.md §3
//! "Process spawning / status-line reading / signal reaping"; §6
//! "Environment").

use std::ffi::CString;

use libc::{c_int, pid_t};

/// `spawn(argv)` (spec.md §4.7): forks, detaches into its own session, and
/// execs `argv[0]` with `argv[1..]`. Mirrors `blinklad-rdwm`'s direct-`libc`
/// style rather than pulling in a process-spawning crate, since the teacher
/// already reaches for raw `fork`/`exec` elsewhere.
pub fn spawn(argv: &[String]) {
    if argv.is_empty() {
        return;
    }
    let argv = argv.to_vec();
    unsafe {
        match libc::fork() {
            -1 => {
                log::error!("spawn: fork failed");
            }
            0 => {
                // Child: detach from the WM's session/controlling terminal
                // so it survives the WM's own exit, then exec.
                libc::setsid();
                exec(&argv);
                libc::_exit(1);
            }
            _ => {
                // Parent: the SIGCHLD handler reaps this child.
            }
        }
    }
}

unsafe fn exec(argv: &[String]) -> ! {
    let cstrings: Vec<CString> = argv.iter().map(|a| CString::new(a.as_str()).unwrap()).collect();
    let mut ptrs: Vec<*const libc::c_char> = cstrings.iter().map(|c| c.as_ptr()).collect();
    ptrs.push(std::ptr::null());
    libc::execvp(cstrings[0].as_ptr(), ptrs.as_ptr());
    log::error!("spawn: execvp {} failed", argv[0]);
    libc::_exit(1);
}

/// Installs a `SIGCHLD` handler that reinstalls itself and reaps every
/// available zombie non-blockingly (spec.md §5 "Zombie reaping"). Installed
/// once during setup, matching the teacher's single `sigaction` call at
/// process start.
pub fn install_sigchld_handler() {
    unsafe {
        let mut action: libc::sigaction = std::mem::zeroed();
        action.sa_sigaction = handle_sigchld as usize;
        libc::sigemptyset(&mut action.sa_mask);
        action.sa_flags = libc::SA_RESTART | libc::SA_NOCLDSTOP;
        libc::sigaction(libc::SIGCHLD, &action, std::ptr::null_mut());
    }
}

extern "C" fn handle_sigchld(_sig: c_int) {
    unsafe {
        let saved_errno = *libc::__errno_location();
        loop {
            let mut status: c_int = 0;
            let pid: pid_t = libc::waitpid(-1, &mut status, libc::WNOHANG);
            if pid <= 0 {
                break;
            }
        }
        *libc::__errno_location() = saved_errno;
    }
}

/// OpenBSD `pledge("stdio rpath proc exec")` (spec.md §6). A no-op
/// everywhere else; `libc` only exposes `pledge` on OpenBSD targets.
#[cfg(target_os = "openbsd")]
pub fn pledge() {
    let promises = CString::new("stdio rpath proc exec").unwrap();
    unsafe {
        if libc::pledge(promises.as_ptr(), std::ptr::null()) == -1 {
            log::warn!("pledge failed");
        }
    }
}

#[cfg(not(target_os = "openbsd"))]
pub fn pledge() {}

//! privileges module
//! Raw socket operations run inside a privilege window, everything else
//! runs unprivileged.
use crate::constants::*;
use crate::debug::{print_debug, Verbose};
use crate::error::Error;

// std
use std::io;

/// Privilege Bracket Trait
pub trait PrivilegeBracket {
    /// make the raw socket privilege effective
    fn acquire(&mut self) -> io::Result<()>;
    /// make it ineffective again, a no-op when it was never held
    fn release(&mut self) -> io::Result<()>;
    /// give up every privilege for the rest of the process lifetime
    fn drop_permanently(&mut self) -> io::Result<()>;
}

// bracketed() function
/// Run `op` with the raw socket privilege effective.
///
/// A failed acquire is only traced, `op` then fails on its own with a
/// permission error. A failed release is fatal.
pub fn bracketed<T, F>(bracket: &mut dyn PrivilegeBracket, debug: &Verbose, op: F) -> Result<T, Error>
where
    F: FnOnce() -> T,
{
    if let Err(e) = bracket.acquire() {
        print_debug(
            debug,
            DEBUG_LEVEL_LOW,
            DEBUG_SRC_PRIVS,
            format!("cannot acquire raw socket privilege: {}", e),
        );
    }
    let result = op();
    bracket
        .release()
        .map_err(|e| Error::Privilege("release", e))?;
    Ok(result)
}

// drop_privileges() function
pub fn drop_privileges(bracket: &mut dyn PrivilegeBracket, debug: &Verbose) -> Result<(), Error> {
    bracket
        .drop_permanently()
        .map_err(|e| Error::Privilege("drop", e))?;
    print_debug(
        debug,
        DEBUG_LEVEL_MEDIUM,
        DEBUG_SRC_PRIVS,
        "privileges dropped".to_string(),
    );
    Ok(())
}

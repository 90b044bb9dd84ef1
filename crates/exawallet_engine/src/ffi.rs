//! Adapter for wallet engines that hand out pending transactions as an opaque
//! pointer plus a C function table.

use std::ffi::{c_void, CStr};
use std::os::raw::{c_char, c_int};
use std::ptr::NonNull;

use tracing::{trace, warn};

use crate::types::{NativePendingTransaction, WalletError};

/// Function table of the native pending-transaction object.
#[repr(C)]
pub struct NativeTxVtable {
    pub amount: unsafe extern "C" fn(*mut c_void) -> u64,
    pub dust: unsafe extern "C" fn(*mut c_void) -> u64,
    pub fee: unsafe extern "C" fn(*mut c_void) -> u64,
    pub tx_count: unsafe extern "C" fn(*mut c_void) -> u64,
    /// Borrowed NUL-terminated id; copied before the next call on the object.
    pub txid_at: unsafe extern "C" fn(*mut c_void, usize) -> *const c_char,
    /// Zero on success. On failure `error_string` describes the native status.
    pub commit: unsafe extern "C" fn(*mut c_void) -> c_int,
    pub error_string: unsafe extern "C" fn(*mut c_void) -> *const c_char,
    pub release: unsafe extern "C" fn(*mut c_void),
}

/// Owning wrapper over a native pending transaction. `release` runs once, on drop.
pub struct FfiPendingTransaction {
    ptr: NonNull<c_void>,
    vtable: &'static NativeTxVtable,
}

// SAFETY: `from_raw` requires an object the native engine lets several
// threads use; the wallet engine locks its own state around each call.
unsafe impl Send for FfiPendingTransaction {}
unsafe impl Sync for FfiPendingTransaction {}

impl FfiPendingTransaction {
    /// Take ownership of `ptr`.
    ///
    /// # Safety
    /// `ptr` must be a live object accepted by every function of `vtable`,
    /// safe to call from any thread, and released by nobody else.
    pub unsafe fn from_raw(ptr: *mut c_void, vtable: &'static NativeTxVtable) -> Result<Self, WalletError> {
        let ptr = NonNull::new(ptr)
            .ok_or_else(|| WalletError::InvalidArgument("native pending transaction is null".into()))?;
        Ok(Self { ptr, vtable })
    }

    fn raw(&self) -> *mut c_void {
        self.ptr.as_ptr()
    }
}

unsafe fn copy_cstr(p: *const c_char) -> Option<String> {
    if p.is_null() {
        return None;
    }
    Some(CStr::from_ptr(p).to_string_lossy().into_owned())
}

impl NativePendingTransaction for FfiPendingTransaction {
    fn amount(&self) -> u64 {
        unsafe { (self.vtable.amount)(self.raw()) }
    }

    fn dust(&self) -> u64 {
        unsafe { (self.vtable.dust)(self.raw()) }
    }

    fn fee(&self) -> u64 {
        unsafe { (self.vtable.fee)(self.raw()) }
    }

    fn tx_count(&self) -> u64 {
        unsafe { (self.vtable.tx_count)(self.raw()) }
    }

    fn txid(&self) -> Result<Vec<String>, WalletError> {
        let count = self.tx_count();
        let count = usize::try_from(count)
            .map_err(|_| WalletError::InvalidArgument(format!("native tx count {count} overflows usize")))?;
        (0..count)
            .map(|i| {
                unsafe { copy_cstr((self.vtable.txid_at)(self.raw(), i)) }.ok_or_else(|| {
                    warn!(index = i, "native engine returned a null txid");
                    WalletError::InvalidArgument(format!("native txid {i} of {count} is null"))
                })
            })
            .collect()
    }

    fn commit(&self) -> Result<(), WalletError> {
        let status = unsafe { (self.vtable.commit)(self.raw()) };
        if status == 0 {
            return Ok(());
        }
        let msg = unsafe { copy_cstr((self.vtable.error_string)(self.raw())) }
            .unwrap_or_else(|| format!("native status {status}"));
        Err(WalletError::Commit(msg))
    }
}

impl Drop for FfiPendingTransaction {
    fn drop(&mut self) {
        trace!("releasing native pending transaction");
        unsafe { (self.vtable.release)(self.raw()) }
    }
}

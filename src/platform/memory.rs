// Working set trimming (standby RAM flush)

/// Whether `trim_working_set` can do anything on this platform.
pub fn can_trim_working_sets() -> bool {
    cfg!(windows)
}

/// Ask Windows to page out the working set of process `pid`. Returns
/// `false` when the process cannot be opened or trimmed.
#[cfg(windows)]
pub fn trim_working_set(pid: u32) -> bool {
    use winapi::um::handleapi::CloseHandle;
    use winapi::um::processthreadsapi::OpenProcess;
    use winapi::um::psapi::EmptyWorkingSet;
    use winapi::um::winnt::{PROCESS_QUERY_INFORMATION, PROCESS_SET_QUOTA};

    unsafe {
        let handle = OpenProcess(PROCESS_QUERY_INFORMATION | PROCESS_SET_QUOTA, 0, pid);
        if handle.is_null() {
            return false;
        }
        let trimmed = EmptyWorkingSet(handle) != 0;
        CloseHandle(handle);
        trimmed
    }
}

#[cfg(not(windows))]
pub fn trim_working_set(_pid: u32) -> bool {
    false
}

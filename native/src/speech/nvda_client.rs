// NVDA controller client loaded dynamically from nvdaControllerClient*.dll.

use super::engine::{EngineError, LoadError, SpeechEngine};
use log::debug;
use std::ffi::OsStr;
use std::iter::once;
use std::os::windows::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use windows::core::{s, PCSTR, PCWSTR};
use windows::Win32::Foundation::{FreeLibrary, HMODULE};
use windows::Win32::System::LibraryLoader::{GetProcAddress, LoadLibraryW};

type TestIfRunningFn = unsafe extern "system" fn() -> u32;
type SpeakTextFn = unsafe extern "system" fn(*const u16) -> u32;
type CancelSpeechFn = unsafe extern "system" fn() -> u32;

type RawProc = unsafe extern "system" fn() -> isize;

pub struct NvdaControllerClient {
    module: HMODULE,
    path: PathBuf,
    test_if_running: TestIfRunningFn,
    speak_text: SpeakTextFn,
    cancel_speech: CancelSpeechFn,
}

impl NvdaControllerClient {
    /// Load the client library at `path` and resolve its entry points.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        if !path.is_file() {
            return Err(LoadError::NotFound(path.to_path_buf()));
        }

        let wide_path = to_wide(path.as_os_str());

        unsafe {
            let module = LoadLibraryW(PCWSTR(wide_path.as_ptr())).map_err(|e| {
                LoadError::LoadFailed {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                }
            })?;

            let resolved = (|| -> Result<(RawProc, RawProc, RawProc), LoadError> {
                Ok((
                    resolve(
                        module,
                        path,
                        "nvdaController_testIfRunning",
                        s!("nvdaController_testIfRunning"),
                    )?,
                    resolve(
                        module,
                        path,
                        "nvdaController_speakText",
                        s!("nvdaController_speakText"),
                    )?,
                    resolve(
                        module,
                        path,
                        "nvdaController_cancelSpeech",
                        s!("nvdaController_cancelSpeech"),
                    )?,
                ))
            })();

            let (test_if_running, speak_text, cancel_speech) = match resolved {
                Ok(procs) => procs,
                Err(e) => {
                    let _ = FreeLibrary(module);
                    return Err(e);
                }
            };

            debug!("[NVDA] Resolved controller entry points in {}", path.display());

            Ok(Self {
                module,
                path: path.to_path_buf(),
                test_if_running: std::mem::transmute::<RawProc, TestIfRunningFn>(test_if_running),
                speak_text: std::mem::transmute::<RawProc, SpeakTextFn>(speak_text),
                cancel_speech: std::mem::transmute::<RawProc, CancelSpeechFn>(cancel_speech),
            })
        }
    }
}

impl SpeechEngine for NvdaControllerClient {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn test_if_running(&self) -> Result<u32, EngineError> {
        Ok(unsafe { (self.test_if_running)() })
    }

    fn speak_text(&self, text: &str) -> Result<u32, EngineError> {
        let wide_text: Vec<u16> = text.encode_utf16().chain(once(0)).collect();
        Ok(unsafe { (self.speak_text)(wide_text.as_ptr()) })
    }

    fn cancel_speech(&self) -> Result<u32, EngineError> {
        Ok(unsafe { (self.cancel_speech)() })
    }
}

impl Drop for NvdaControllerClient {
    fn drop(&mut self) {
        unsafe {
            let _ = FreeLibrary(self.module);
        }
    }
}

unsafe fn resolve(
    module: HMODULE,
    path: &Path,
    symbol: &'static str,
    name: PCSTR,
) -> Result<RawProc, LoadError> {
    GetProcAddress(module, name).ok_or_else(|| LoadError::MissingSymbol {
        path: path.to_path_buf(),
        symbol,
    })
}

fn to_wide(s: &OsStr) -> Vec<u16> {
    s.encode_wide().chain(once(0)).collect()
}

// Named pipe server over the Win32 message-mode pipe API.

use super::{decode_message, ChunkRead, MessageReader, Transport, TransportError, MAX_MESSAGE_SIZE};
use log::{debug, info, warn};
use std::io;
use windows::core::HSTRING;
use windows::Win32::Foundation::{
    CloseHandle, ERROR_BROKEN_PIPE, ERROR_MORE_DATA, ERROR_NO_DATA, ERROR_PIPE_CONNECTED,
    ERROR_PIPE_NOT_CONNECTED, HANDLE,
};
use windows::Win32::Storage::FileSystem::{
    FlushFileBuffers, ReadFile, WriteFile, FILE_FLAG_FIRST_PIPE_INSTANCE, PIPE_ACCESS_DUPLEX,
};
use windows::Win32::System::Pipes::{
    ConnectNamedPipe, CreateNamedPipeW, DisconnectNamedPipe, PIPE_READMODE_MESSAGE,
    PIPE_TYPE_MESSAGE, PIPE_WAIT,
};

/// Bytes requested per `ReadFile`; longer messages arrive in several chunks.
const READ_CHUNK_SIZE: usize = 4096;

/// Message-mode pipe serving a single client.
pub struct PipeServer {
    path: String,
    handle: Option<HANDLE>,
    reader: MessageReader,
}

impl PipeServer {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            handle: None,
            reader: MessageReader::new(READ_CHUNK_SIZE, MAX_MESSAGE_SIZE),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl Transport for PipeServer {
    fn connect(&mut self) -> Result<(), TransportError> {
        let handle = unsafe {
            CreateNamedPipeW(
                &HSTRING::from(self.path.as_str()),
                PIPE_ACCESS_DUPLEX | FILE_FLAG_FIRST_PIPE_INSTANCE,
                PIPE_TYPE_MESSAGE | PIPE_READMODE_MESSAGE | PIPE_WAIT,
                1,
                MAX_MESSAGE_SIZE as u32,
                MAX_MESSAGE_SIZE as u32,
                0,
                None,
            )
        };
        if handle.is_invalid() {
            return Err(TransportError::Create {
                pipe: self.path.clone(),
                source: io::Error::last_os_error(),
            });
        }
        self.handle = Some(handle);

        info!("[PIPE] Waiting for client connection on {}", self.path);
        if let Err(e) = unsafe { ConnectNamedPipe(handle, None) } {
            // The client may connect between creation and this call.
            if e.code() != ERROR_PIPE_CONNECTED.to_hresult() {
                return Err(TransportError::Connect(e.into()));
            }
        }
        info!("[PIPE] Client connected");

        Ok(())
    }

    fn read(&mut self) -> Result<Option<String>, TransportError> {
        let handle = self.handle.ok_or(TransportError::NotConnected)?;

        let message = self
            .reader
            .read_message(|buffer| read_chunk(handle, buffer))?;

        Ok(message.and_then(|bytes| decode_message(&bytes)))
    }

    fn write(&mut self, message: &str) -> Result<(), TransportError> {
        let handle = self.handle.ok_or(TransportError::NotConnected)?;

        let mut written = 0u32;
        unsafe {
            WriteFile(
                handle,
                Some(message.as_bytes()),
                Some(&mut written as *mut u32),
                None,
            )
            .map_err(io::Error::from)?;
            FlushFileBuffers(handle).map_err(io::Error::from)?;
        }

        Ok(())
    }

    fn close(&mut self) {
        if let Some(handle) = self.handle.take() {
            unsafe {
                if let Err(e) = DisconnectNamedPipe(handle) {
                    warn!("[PIPE] Disconnect failed: {}", e);
                }
                let _ = CloseHandle(handle);
            }
            info!("[PIPE] Pipe closed");
        }
    }
}

fn read_chunk(handle: HANDLE, buffer: &mut [u8]) -> io::Result<ChunkRead> {
    let mut read = 0u32;
    let result = unsafe { ReadFile(handle, Some(buffer), Some(&mut read as *mut u32), None) };

    match result {
        Ok(()) => Ok(ChunkRead::Complete(read as usize)),
        Err(e) if e.code() == ERROR_MORE_DATA.to_hresult() => Ok(ChunkRead::Partial(read as usize)),
        Err(e) if is_disconnect(&e) => {
            debug!("[PIPE] Client disconnected: {}", e);
            Ok(ChunkRead::Closed)
        }
        Err(e) => Err(e.into()),
    }
}

fn is_disconnect(error: &windows::core::Error) -> bool {
    [ERROR_BROKEN_PIPE, ERROR_PIPE_NOT_CONNECTED, ERROR_NO_DATA]
        .iter()
        .any(|code| error.code() == code.to_hresult())
}

impl Drop for PipeServer {
    fn drop(&mut self) {
        self.close();
    }
}

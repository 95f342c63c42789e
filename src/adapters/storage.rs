//! Persistent storage adapter.
//!
//! Implements both [`StoragePort`] and [`ConfigPort`] for the horn.
//!
//! - The calibration store is an EEPROM-style byte image of
//!   [`IMAGE_BYTES`] kept in RAM and persisted whole as one NVS blob
//!   (`bikehorn::eeprom`), so every write is atomic.
//! - The configuration is a separate postcard blob (`bikehorn::horncfg`),
//!   validated before it is written and after it is read.
//!
//! On the host both blobs live in memory only.

use log::info;
#[cfg(target_os = "espidf")]
use log::warn;

use crate::app::ports::{ConfigError, ConfigPort, StorageError, StoragePort};
use crate::config::HornConfig;
use crate::sound::calibration::IMAGE_BYTES;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
const NAMESPACE: &[u8] = b"bikehorn\0";
#[cfg(target_os = "espidf")]
const IMAGE_KEY: &[u8] = b"eeprom\0";
#[cfg(target_os = "espidf")]
const CONFIG_KEY: &[u8] = b"horncfg\0";

/// Larger config blobs are treated as corrupt.
const MAX_CONFIG_BLOB: usize = 256;

pub struct EepromAdapter {
    image: Vec<u8>,
    image_present: bool,
    #[cfg(not(target_os = "espidf"))]
    config_blob: Option<Vec<u8>>,
}

impl EepromAdapter {
    /// Initialise NVS and pull the calibration image into RAM.
    ///
    /// On first boot or after a version mismatch the NVS partition is
    /// erased and re-initialised automatically.  A missing image is not an
    /// error: reads report [`StorageError::NotFound`] until the first write.
    #[cfg(target_os = "espidf")]
    pub fn new() -> Result<Self, StorageError> {
        // SAFETY: nvs_flash_init / nvs_flash_erase are called from the
        // single main-task context before any concurrent NVS access.
        let ret = unsafe { nvs_flash_init() };
        if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
            warn!("NVS: erasing and re-initialising flash partition");
            if unsafe { nvs_flash_erase() } != ESP_OK || unsafe { nvs_flash_init() } != ESP_OK {
                return Err(StorageError::IoError);
            }
        } else if ret != ESP_OK {
            return Err(StorageError::IoError);
        }

        let mut image = vec![0xFF; IMAGE_BYTES];
        let image_present = match read_blob(IMAGE_KEY, &mut image) {
            Ok(n) if n == IMAGE_BYTES => true,
            Ok(n) => {
                warn!("EepromAdapter: image is {} bytes, expected {}; ignoring", n, IMAGE_BYTES);
                image.fill(0xFF);
                false
            }
            Err(StorageError::NotFound) => false,
            Err(e) => return Err(e),
        };
        info!(
            "EepromAdapter: NVS initialised (calibration image {})",
            if image_present { "loaded" } else { "absent" }
        );
        Ok(Self {
            image,
            image_present,
        })
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Result<Self, StorageError> {
        info!("EepromAdapter: simulation backend");
        Ok(Self {
            image: vec![0xFF; IMAGE_BYTES],
            image_present: false,
            config_blob: None,
        })
    }

    /// Simulation backend pre-loaded with `image` (zero-padded or
    /// truncated to [`IMAGE_BYTES`]).
    #[cfg(not(target_os = "espidf"))]
    pub fn with_image(image: &[u8]) -> Self {
        let mut buf = vec![0u8; IMAGE_BYTES];
        let n = image.len().min(IMAGE_BYTES);
        buf[..n].copy_from_slice(&image[..n]);
        Self {
            image: buf,
            image_present: true,
            config_blob: None,
        }
    }

    pub fn has_image(&self) -> bool {
        self.image_present
    }

    fn range(offset: usize, len: usize) -> Result<core::ops::Range<usize>, StorageError> {
        let end = offset.checked_add(len).ok_or(StorageError::OutOfBounds)?;
        if end > IMAGE_BYTES {
            return Err(StorageError::OutOfBounds);
        }
        Ok(offset..end)
    }

    #[cfg(target_os = "espidf")]
    fn persist_image(&self) -> Result<(), StorageError> {
        write_blob(IMAGE_KEY, &self.image)
    }

    #[cfg(not(target_os = "espidf"))]
    fn persist_image(&self) -> Result<(), StorageError> {
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn load_config_blob(&self) -> Result<Option<Vec<u8>>, StorageError> {
        let mut buf = vec![0u8; MAX_CONFIG_BLOB];
        match read_blob(CONFIG_KEY, &mut buf) {
            Ok(n) => {
                buf.truncate(n);
                Ok(Some(buf))
            }
            Err(StorageError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn load_config_blob(&self) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.config_blob.clone())
    }

    #[cfg(target_os = "espidf")]
    fn store_config_blob(&mut self, bytes: Vec<u8>) -> Result<(), StorageError> {
        write_blob(CONFIG_KEY, &bytes)
    }

    #[cfg(not(target_os = "espidf"))]
    fn store_config_blob(&mut self, bytes: Vec<u8>) -> Result<(), StorageError> {
        self.config_blob = Some(bytes);
        Ok(())
    }
}

// ── NVS helpers ───────────────────────────────────────────────

/// Open the horn's NVS namespace, execute a closure with the handle, then close.
#[cfg(target_os = "espidf")]
fn with_nvs_handle<F, T>(write: bool, f: F) -> Result<T, i32>
where
    F: FnOnce(nvs_handle_t) -> Result<T, i32>,
{
    let mut handle: nvs_handle_t = 0;
    let mode = if write {
        nvs_open_mode_t_NVS_READWRITE
    } else {
        nvs_open_mode_t_NVS_READONLY
    };

    let ret = unsafe { nvs_open(NAMESPACE.as_ptr() as *const _, mode, &mut handle) };
    if ret != ESP_OK {
        return Err(ret);
    }

    let result = f(handle);
    unsafe {
        nvs_close(handle);
    }
    result
}

/// Read a blob into `buf`; returns the stored length.
#[cfg(target_os = "espidf")]
fn read_blob(key: &[u8], buf: &mut [u8]) -> Result<usize, StorageError> {
    let result = with_nvs_handle(false, |handle| {
        let mut size = buf.len();
        let ret = unsafe {
            nvs_get_blob(
                handle,
                key.as_ptr() as *const _,
                buf.as_mut_ptr() as *mut _,
                &mut size,
            )
        };
        if ret != ESP_OK {
            return Err(ret);
        }
        Ok(size)
    });
    match result {
        Ok(size) => Ok(size),
        Err(e) if e == ESP_ERR_NVS_NOT_FOUND => Err(StorageError::NotFound),
        Err(e) => {
            warn!("EepromAdapter: NVS read error {}", e);
            Err(StorageError::IoError)
        }
    }
}

#[cfg(target_os = "espidf")]
fn write_blob(key: &[u8], data: &[u8]) -> Result<(), StorageError> {
    let result = with_nvs_handle(true, |handle| {
        let ret = unsafe {
            nvs_set_blob(
                handle,
                key.as_ptr() as *const _,
                data.as_ptr() as *const _,
                data.len(),
            )
        };
        if ret != ESP_OK {
            return Err(ret);
        }
        let ret = unsafe { nvs_commit(handle) };
        if ret != ESP_OK {
            return Err(ret);
        }
        Ok(())
    });
    result.map_err(|e| {
        warn!("EepromAdapter: NVS write error {}", e);
        StorageError::IoError
    })
}

// ── StoragePort ───────────────────────────────────────────────

impl StoragePort for EepromAdapter {
    fn capacity(&self) -> usize {
        IMAGE_BYTES
    }

    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<(), StorageError> {
        let range = Self::range(offset, buf.len())?;
        if !self.image_present {
            return Err(StorageError::NotFound);
        }
        buf.copy_from_slice(&self.image[range]);
        Ok(())
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), StorageError> {
        let range = Self::range(offset, data.len())?;
        let start = range.start;
        self.image[range].copy_from_slice(data);
        // A failed commit leaves the bytes in RAM; the next write retries them.
        self.persist_image()?;
        self.image_present = true;
        info!("EepromAdapter: wrote {} bytes at 0x{:03x}", data.len(), start);
        Ok(())
    }
}

// ── ConfigPort ────────────────────────────────────────────────

impl ConfigPort for EepromAdapter {
    fn load(&self) -> Result<HornConfig, ConfigError> {
        let Some(bytes) = self.load_config_blob().map_err(|_| ConfigError::IoError)? else {
            info!("EepromAdapter: no stored config, using defaults");
            return Ok(HornConfig::default());
        };
        if bytes.len() > MAX_CONFIG_BLOB {
            return Err(ConfigError::Corrupted);
        }
        let cfg: HornConfig = postcard::from_bytes(&bytes).map_err(|_| ConfigError::Corrupted)?;
        cfg.validate()?;
        info!("EepromAdapter: loaded config ({} bytes)", bytes.len());
        Ok(cfg)
    }

    fn save(&mut self, config: &HornConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;
        if bytes.len() > MAX_CONFIG_BLOB {
            return Err(ConfigError::StorageFull);
        }
        let len = bytes.len();
        self.store_config_blob(bytes).map_err(|_| ConfigError::IoError)?;
        info!("EepromAdapter: config saved ({} bytes)", len);
        Ok(())
    }
}

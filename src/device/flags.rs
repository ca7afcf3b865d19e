//! Device and open flags.

bitflags::bitflags! {
    /// How a device was registered, how it is opened, and its runtime state
    /// (`ACTIVATED`, `SUSPENDED`).
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct DeviceFlags: u16 {
        // RDWR first so that Debug prints it instead of RDONLY | WRONLY
        const RDWR       = 0x003;
        const RDONLY     = 0x001;
        const WRONLY     = 0x002;
        /// Device may be hot-unplugged.
        const REMOVABLE  = 0x004;
        /// Device admits a single open handle at a time.
        const STANDALONE = 0x008;
        /// Set once the device has been initialized.
        const ACTIVATED  = 0x010;
        /// Set while the device is suspended.
        const SUSPENDED  = 0x020;
        const STREAM     = 0x040;
    }
}

impl DeviceFlags {
    /// The read/write access bits only.
    pub fn access(self) -> Self {
        self & Self::RDWR
    }

    /// Flags with the runtime state bits removed.
    pub fn without_runtime(self) -> Self {
        self - (Self::ACTIVATED | Self::SUSPENDED)
    }
}

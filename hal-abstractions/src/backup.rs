//! Backup (battery-backed) domain access

/// Write access to the battery-backed domain
///
/// After every reset the backup domain is write protected. Writers must
/// call [`BackupAccess::enable_backup_access`] immediately before touching
/// any backup-domain register; there is no lock, the firmware is single
/// threaded on this path.
pub trait BackupAccess {
    /// Enable the power/backup interface clocks and clear write protection.
    fn enable_backup_access(&mut self);
}

/// General purpose registers that survive main power loss
pub trait BackupRegisters: BackupAccess {
    /// Read backup data register `index`.
    ///
    /// `index` is the register number used by the reference manual, so
    /// DR1 is index 1.
    fn read_backup(&self, index: usize) -> u16;

    /// Write backup data register `index`.
    ///
    /// Backup access must already be enabled.
    fn write_backup(&mut self, index: usize, value: u16);
}

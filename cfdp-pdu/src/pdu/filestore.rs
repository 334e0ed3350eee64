use camino::Utf8PathBuf;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use super::{
    error::{PDUError, PDUResult},
    lv::LV,
    tlv::{impl_try_from_tlv, TLVEncode, TLVType, TLV},
};

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive)]
/// Actions which can be take via a FileStore Request to a CFDP entity.
pub enum FileStoreAction {
    /// Create a new file on disk.
    CreateFile = 0b0000,
    /// Delete an existing file on disk. Errors if the file does not exist.
    DeleteFile = 0b0001,
    /// Rename a file on disk. Requires a second filename.
    RenameFile = 0b0010,
    /// Append to a filename on disk. Requires a second filename
    AppendFile = 0b0011,
    /// Replace a file with one of a different name. Requires a second filename
    ReplaceFile = 0b0100,
    CreateDirectory = 0b0101,
    RemoveDirectory = 0b0110,
    /// Delete a file if present. Does not fail if file does not exist.
    DenyFile = 0b0111,
    /// Remove a directory if present. Does not fail if directory does not exit.
    DenyDirectory = 0b1000,
}
impl FileStoreAction {
    /// Rename, append and replace carry a second file name on the wire.
    pub fn has_second_filename(&self) -> bool {
        matches!(self, Self::RenameFile | Self::AppendFile | Self::ReplaceFile)
    }

    fn from_high_nibble(byte: u8) -> PDUResult<Self> {
        let possible_action = (byte & 0xF0) >> 4;
        Self::from_u8(possible_action).ok_or(PDUError::InvalidFileStoreAction(possible_action))
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive)]
pub enum CreateFileStatus {
    Successful = 0b0000,
    NotAllowed = 0b0001,
    NotPerformed = 0b1111,
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive)]
pub enum DeleteFileStatus {
    Successful = 0b0000,
    FileDoesNotExist = 0b0001,
    DeleteNotAllowed = 0b0010,
    NotPerformed = 0b1111,
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive)]
pub enum RenameStatus {
    Successful = 0b0000,
    OldFilenameDoesNotExist = 0b0001,
    NewFilenameAlreadyExists = 0b0010,
    RenameNotAllowed = 0b0011,
    NotPerformed = 0b1111,
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive)]
/// Shared by append and replace, which report the same conditions.
pub enum TwoFileStatus {
    Successful = 0b0000,
    Filename1DoesNotExist = 0b0001,
    Filename2DoesNotExist = 0b0010,
    NotAllowed = 0b0011,
    NotPerformed = 0b1111,
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive)]
pub enum CreateDirectoryStatus {
    Successful = 0b0000,
    DirectoryCannotBeCreated = 0b0001,
    NotPerformed = 0b1111,
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive)]
pub enum RemoveDirectoryStatus {
    Successful = 0b0000,
    DirectoryDoesNotExist = 0b0001,
    DeleteNotAllowed = 0b0010,
    NotPerformed = 0b1111,
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive)]
pub enum DenyStatus {
    Successful = 0b0000,
    NotAllowed = 0b0010,
    NotPerformed = 0b1111,
}

/// An action code paired with one of the status codes legal for that action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileStoreStatus {
    CreateFile(CreateFileStatus),
    DeleteFile(DeleteFileStatus),
    RenameFile(RenameStatus),
    AppendFile(TwoFileStatus),
    ReplaceFile(TwoFileStatus),
    CreateDirectory(CreateDirectoryStatus),
    RemoveDirectory(RemoveDirectoryStatus),
    DenyFile(DenyStatus),
    DenyDirectory(DenyStatus),
}
impl FileStoreStatus {
    pub fn action(&self) -> FileStoreAction {
        match self {
            Self::CreateFile(_) => FileStoreAction::CreateFile,
            Self::DeleteFile(_) => FileStoreAction::DeleteFile,
            Self::RenameFile(_) => FileStoreAction::RenameFile,
            Self::AppendFile(_) => FileStoreAction::AppendFile,
            Self::ReplaceFile(_) => FileStoreAction::ReplaceFile,
            Self::CreateDirectory(_) => FileStoreAction::CreateDirectory,
            Self::RemoveDirectory(_) => FileStoreAction::RemoveDirectory,
            Self::DenyFile(_) => FileStoreAction::DenyFile,
            Self::DenyDirectory(_) => FileStoreAction::DenyDirectory,
        }
    }

    pub fn status_code(&self) -> u8 {
        match self {
            Self::CreateFile(val) => *val as u8,
            Self::DeleteFile(val) => *val as u8,
            Self::RenameFile(val) => *val as u8,
            Self::AppendFile(val) | Self::ReplaceFile(val) => *val as u8,
            Self::CreateDirectory(val) => *val as u8,
            Self::RemoveDirectory(val) => *val as u8,
            Self::DenyFile(val) | Self::DenyDirectory(val) => *val as u8,
        }
    }

    /// Action code in the high nibble, status code in the low nibble.
    pub fn as_u8(&self) -> u8 {
        ((self.action() as u8) << 4) | self.status_code()
    }

    pub fn success(&self) -> bool {
        self.status_code() == 0b0000
    }

    pub fn is_fail(&self) -> bool {
        !self.success()
    }

    pub fn get_not_performed(action: FileStoreAction) -> Self {
        match action {
            FileStoreAction::CreateFile => Self::CreateFile(CreateFileStatus::NotPerformed),
            FileStoreAction::DeleteFile => Self::DeleteFile(DeleteFileStatus::NotPerformed),
            FileStoreAction::RenameFile => Self::RenameFile(RenameStatus::NotPerformed),
            FileStoreAction::AppendFile => Self::AppendFile(TwoFileStatus::NotPerformed),
            FileStoreAction::ReplaceFile => Self::ReplaceFile(TwoFileStatus::NotPerformed),
            FileStoreAction::CreateDirectory => {
                Self::CreateDirectory(CreateDirectoryStatus::NotPerformed)
            }
            FileStoreAction::RemoveDirectory => {
                Self::RemoveDirectory(RemoveDirectoryStatus::NotPerformed)
            }
            FileStoreAction::DenyFile => Self::DenyFile(DenyStatus::NotPerformed),
            FileStoreAction::DenyDirectory => Self::DenyDirectory(DenyStatus::NotPerformed),
        }
    }

    /// Pair `action` with a raw status code, failing when the code is not defined for
    /// that action.
    pub fn get_status(action: FileStoreAction, status: u8) -> PDUResult<Self> {
        let invalid = || PDUError::InvalidFileStoreStatus(status, action);
        match action {
            FileStoreAction::CreateFile => CreateFileStatus::from_u8(status)
                .map(Self::CreateFile)
                .ok_or_else(invalid),
            FileStoreAction::DeleteFile => DeleteFileStatus::from_u8(status)
                .map(Self::DeleteFile)
                .ok_or_else(invalid),
            FileStoreAction::RenameFile => RenameStatus::from_u8(status)
                .map(Self::RenameFile)
                .ok_or_else(invalid),
            FileStoreAction::AppendFile => TwoFileStatus::from_u8(status)
                .map(Self::AppendFile)
                .ok_or_else(invalid),
            FileStoreAction::ReplaceFile => TwoFileStatus::from_u8(status)
                .map(Self::ReplaceFile)
                .ok_or_else(invalid),
            FileStoreAction::CreateDirectory => CreateDirectoryStatus::from_u8(status)
                .map(Self::CreateDirectory)
                .ok_or_else(invalid),
            FileStoreAction::RemoveDirectory => RemoveDirectoryStatus::from_u8(status)
                .map(Self::RemoveDirectory)
                .ok_or_else(invalid),
            FileStoreAction::DenyFile => DenyStatus::from_u8(status)
                .map(Self::DenyFile)
                .ok_or_else(invalid),
            FileStoreAction::DenyDirectory => DenyStatus::from_u8(status)
                .map(Self::DenyDirectory)
                .ok_or_else(invalid),
        }
    }
}

fn write_filenames(
    buffer: &mut Vec<u8>,
    action: FileStoreAction,
    first_filename: &Utf8PathBuf,
    second_filename: &Utf8PathBuf,
) -> PDUResult<()> {
    LV::from_path(first_filename)?.write_to(buffer);
    if action.has_second_filename() {
        LV::from_path(second_filename)?.write_to(buffer);
    }
    Ok(())
}

/// Returns both file names and the number of bytes consumed.
fn read_filenames(
    buffer: &[u8],
    action: FileStoreAction,
) -> PDUResult<(Utf8PathBuf, Utf8PathBuf, usize)> {
    let first = LV::unpack(buffer)?;
    let mut consumed = first.packet_len();
    let second_filename = match action.has_second_filename() {
        true => {
            let second = LV::unpack(&buffer[consumed..])?;
            consumed += second.packet_len();
            second.to_path()?
        }
        false => Utf8PathBuf::new(),
    };
    Ok((first.to_path()?, second_filename, consumed))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStoreRequestTLV {
    pub action_code: FileStoreAction,
    pub first_filename: Utf8PathBuf,
    /// Only encoded for rename, append, and replace actions.
    pub second_filename: Utf8PathBuf,
}
impl FileStoreRequestTLV {
    pub fn new(
        action_code: FileStoreAction,
        first_filename: impl Into<Utf8PathBuf>,
        second_filename: impl Into<Utf8PathBuf>,
    ) -> Self {
        Self {
            action_code,
            first_filename: first_filename.into(),
            second_filename: second_filename.into(),
        }
    }
}
impl TLVEncode for FileStoreRequestTLV {
    const TLV_TYPE: TLVType = TLVType::FileStoreRequest;

    fn to_tlv(&self) -> PDUResult<TLV> {
        let mut value = vec![(self.action_code as u8) << 4];
        write_filenames(
            &mut value,
            self.action_code,
            &self.first_filename,
            &self.second_filename,
        )?;
        TLV::new(Self::TLV_TYPE, value)
    }

    fn from_tlv(tlv: &TLV) -> PDUResult<Self> {
        tlv.expect_type(Self::TLV_TYPE)?;
        let value = tlv.value();
        let first_byte = *value.first().ok_or(PDUError::BufferTooShort {
            expected: 1,
            found: 0,
        })?;
        let action_code = FileStoreAction::from_high_nibble(first_byte)?;
        let (first_filename, second_filename, _) = read_filenames(&value[1..], action_code)?;
        Ok(Self {
            action_code,
            first_filename,
            second_filename,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStoreResponseTLV {
    pub action_and_status: FileStoreStatus,
    pub first_filename: Utf8PathBuf,
    /// Only encoded for rename, append, and replace actions.
    pub second_filename: Utf8PathBuf,
    pub filestore_message: Vec<u8>,
}
impl FileStoreResponseTLV {
    /// Build a response from a raw status code, validating it against the action.
    pub fn new(
        action: FileStoreAction,
        status: u8,
        first_filename: impl Into<Utf8PathBuf>,
        second_filename: impl Into<Utf8PathBuf>,
        filestore_message: Vec<u8>,
    ) -> PDUResult<Self> {
        Ok(Self {
            action_and_status: FileStoreStatus::get_status(action, status)?,
            first_filename: first_filename.into(),
            second_filename: second_filename.into(),
            filestore_message,
        })
    }

    pub fn not_performed(request: &FileStoreRequestTLV) -> Self {
        Self {
            action_and_status: FileStoreStatus::get_not_performed(request.action_code),
            first_filename: request.first_filename.clone(),
            second_filename: request.second_filename.clone(),
            filestore_message: vec![],
        }
    }

    /// Size of the packed TLV, type and length bytes included.
    pub fn encoded_len(&self) -> usize {
        let second = match self.action_and_status.action().has_second_filename() {
            true => 1 + self.second_filename.as_str().len(),
            false => 0,
        };
        2 + 1
            + (1 + self.first_filename.as_str().len())
            + second
            + (1 + self.filestore_message.len())
    }
}
impl TLVEncode for FileStoreResponseTLV {
    const TLV_TYPE: TLVType = TLVType::FileStoreResponse;

    fn to_tlv(&self) -> PDUResult<TLV> {
        let action = self.action_and_status.action();
        let mut value = vec![self.action_and_status.as_u8()];
        write_filenames(
            &mut value,
            action,
            &self.first_filename,
            &self.second_filename,
        )?;
        LV::new(self.filestore_message.clone())?.write_to(&mut value);
        TLV::new(Self::TLV_TYPE, value)
    }

    fn from_tlv(tlv: &TLV) -> PDUResult<Self> {
        tlv.expect_type(Self::TLV_TYPE)?;
        let value = tlv.value();
        let first_byte = *value.first().ok_or(PDUError::BufferTooShort {
            expected: 1,
            found: 0,
        })?;
        let action = FileStoreAction::from_high_nibble(first_byte)?;
        let action_and_status = FileStoreStatus::get_status(action, first_byte & 0x0F)?;

        let (first_filename, second_filename, consumed) = read_filenames(&value[1..], action)?;
        let filestore_message = LV::unpack(&value[1 + consumed..])?.value().to_vec();
        Ok(Self {
            action_and_status,
            first_filename,
            second_filename,
            filestore_message,
        })
    }
}

impl_try_from_tlv!(FileStoreRequestTLV, FileStoreResponseTLV);

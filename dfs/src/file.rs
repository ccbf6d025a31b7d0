//! # 文件描述符层
//!
//! 在句柄之上维护读写位置与打开方式，供需要顺序读写的调用者使用。
//! 描述符即表中的下标；同一个文件同时只能被一个描述符持有。

use alloc::string::String;
use alloc::vec::Vec;

use derive_more::{Display, From, Into};
use enumflags2::{BitFlags, bitflags};

use crate::{Dfs, Error, Handle, MAX_OPEN_FILES, MAX_READWRITE_BYTES, Result};

#[bitflags]
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenFlag {
    Read = 0b01,
    Write = 0b10,
}

impl OpenFlag {
    /// 解析`"r"`、`"w"`、`"rw"`
    pub fn parse(mode: &str) -> Result<BitFlags<OpenFlag>> {
        match mode {
            "r" => Ok(OpenFlag::Read.into()),
            "w" => Ok(OpenFlag::Write.into()),
            "rw" => Ok(OpenFlag::Read | OpenFlag::Write),
            _ => Err(Error::InvalidMode),
        }
    }
}

/// 文件描述符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, From, Into)]
#[repr(transparent)]
pub struct Fd(usize);

/// 定位的基准
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    Set,
    Cur,
    End,
}

#[derive(Debug)]
struct OpenFile {
    name: String,
    handle: Handle,
    mode: BitFlags<OpenFlag>,
    /// **文件**内的偏移量
    position: u32,
    eof: bool,
}

/// 打开文件表
#[derive(Debug)]
pub struct FileTable {
    files: Vec<Option<OpenFile>>,
}

impl Default for FileTable {
    fn default() -> Self {
        Self::new()
    }
}

impl FileTable {
    pub fn new() -> Self {
        Self {
            files: (0..MAX_OPEN_FILES).map(|_| None).collect(),
        }
    }

    /// 打开文件，不存在则新建。
    /// 只写打开已存在的文件时，先删除再重建，即清空文件。
    pub fn open(&mut self, dfs: &Dfs, name: &str, mode: BitFlags<OpenFlag>) -> Result<Fd> {
        if mode.is_empty() {
            return Err(Error::InvalidMode);
        }
        if self.is_open(name) {
            return Err(Error::AlreadyOpen);
        }
        let slot = self
            .files
            .iter()
            .position(Option::is_none)
            .ok_or(Error::TooManyOpenFiles)?;

        if mode == BitFlags::from(OpenFlag::Write) {
            match dfs.find(name) {
                Ok(handle) => dfs.delete(handle)?,
                Err(Error::NotFound) => {}
                Err(e) => return Err(e),
            }
        }
        let handle = dfs.open(name)?;

        self.files[slot] = Some(OpenFile {
            name: name.into(),
            handle,
            mode,
            position: 0,
            eof: false,
        });
        Ok(Fd(slot))
    }

    pub fn close(&mut self, fd: Fd) -> Result<()> {
        self.files
            .get_mut(fd.0)
            .and_then(Option::take)
            .map(|_| ())
            .ok_or(Error::BadDescriptor)
    }

    /// 从当前位置读出至多`buf.len()`字节，不会越过文件末尾
    pub fn read(&mut self, dfs: &Dfs, fd: Fd, buf: &mut [u8]) -> Result<usize> {
        if buf.len() > MAX_READWRITE_BYTES {
            return Err(Error::TooManyBytes);
        }
        let file = self.get_mut(fd)?;
        if !file.mode.contains(OpenFlag::Read) {
            return Err(Error::PermissionDenied);
        }

        let size = dfs.size(file.handle)?;
        if file.position >= size {
            file.eof = true;
            return Err(Error::EndOfFile);
        }

        let len = buf.len().min((size - file.position) as usize);
        let read_size = dfs.read(file.handle, file.position, &mut buf[..len])?;
        file.position += read_size as u32;
        file.eof = file.position >= size;

        Ok(read_size)
    }

    /// 在当前位置写入`buf`
    pub fn write(&mut self, dfs: &Dfs, fd: Fd, buf: &[u8]) -> Result<usize> {
        if buf.len() > MAX_READWRITE_BYTES {
            return Err(Error::TooManyBytes);
        }
        let file = self.get_mut(fd)?;
        if !file.mode.contains(OpenFlag::Write) {
            return Err(Error::PermissionDenied);
        }

        let written_size = dfs.write(file.handle, file.position, buf)?;
        file.position += written_size as u32;

        Ok(written_size)
    }

    /// 移动读写位置并返回新的位置，同时清除文件末尾标记
    pub fn seek(&mut self, dfs: &Dfs, fd: Fd, offset: i64, whence: Whence) -> Result<u32> {
        let file = self.get_mut(fd)?;
        let base = match whence {
            Whence::Set => 0,
            Whence::Cur => file.position as i64,
            Whence::End => dfs.size(file.handle)? as i64,
        };

        let position = base + offset;
        if !(0..=u32::MAX as i64).contains(&position) {
            return Err(Error::InvalidSeek);
        }
        file.position = position as u32;
        file.eof = false;

        Ok(file.position)
    }

    #[inline]
    pub fn position(&self, fd: Fd) -> Result<u32> {
        self.get(fd).map(|file| file.position)
    }

    #[inline]
    pub fn is_eof(&self, fd: Fd) -> Result<bool> {
        self.get(fd).map(|file| file.eof)
    }

    /// 删除未被打开的文件
    pub fn delete(&self, dfs: &Dfs, name: &str) -> Result<()> {
        if self.is_open(name) {
            return Err(Error::AlreadyOpen);
        }
        dfs.delete(dfs.find(name)?)
    }

    fn is_open(&self, name: &str) -> bool {
        self.files.iter().flatten().any(|file| file.name == name)
    }

    fn get(&self, fd: Fd) -> Result<&OpenFile> {
        self.files
            .get(fd.0)
            .and_then(Option::as_ref)
            .ok_or(Error::BadDescriptor)
    }

    fn get_mut(&mut self, fd: Fd) -> Result<&mut OpenFile> {
        self.files
            .get_mut(fd.0)
            .and_then(Option::as_mut)
            .ok_or(Error::BadDescriptor)
    }
}

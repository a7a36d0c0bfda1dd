// ABOUTME: Shared fakes for tollgate-core integration tests.
// ABOUTME: FakeRemote records uploads and commands; RecordingStorage counts every storage call.

#![allow(dead_code)]

use async_trait::async_trait;
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tollgate_core::role::RoleEntry;
use tollgate_core::storage::{MemoryStorage, Storage, StorageEntry, StorageError};
use tollgate_core::{CredsBackend, IssuerSettings, Salt};
use tollgate_ssh::{CommandOutput, RemoteHost, RemoteTarget, SshError};

/// One call made against the fake target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    Upload {
        user: String,
        host: IpAddr,
        port: u16,
        path: String,
        contents: Vec<u8>,
    },
    Exec {
        user: String,
        host: IpAddr,
        command: String,
    },
}

/// Step at which the fake target should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailAt {
    /// Fail the nth upload (1-based).
    Upload(usize),
    Exec,
}

#[derive(Default)]
pub struct FakeRemote {
    calls: Mutex<Vec<RemoteCall>>,
    fail_at: Option<FailAt>,
}

impl FakeRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing(fail_at: FailAt) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            fail_at: Some(fail_at),
        })
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.calls.lock().unwrap().clone()
    }

    fn uploads_so_far(&self) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| matches!(c, RemoteCall::Upload { .. }))
            .count()
    }

    fn refused(target: &RemoteTarget) -> SshError {
        SshError::RemoteCommand {
            addr: target.addr(),
            status: 1,
            stderr: "permission denied".to_string(),
        }
    }
}

#[async_trait]
impl RemoteHost for FakeRemote {
    async fn upload(
        &self,
        target: &RemoteTarget,
        path: &str,
        contents: &[u8],
    ) -> tollgate_ssh::Result<()> {
        if self.fail_at == Some(FailAt::Upload(self.uploads_so_far() + 1)) {
            return Err(Self::refused(target));
        }
        self.calls.lock().unwrap().push(RemoteCall::Upload {
            user: target.user.clone(),
            host: target.host,
            port: target.port,
            path: path.to_string(),
            contents: contents.to_vec(),
        });
        Ok(())
    }

    async fn exec(
        &self,
        target: &RemoteTarget,
        command: &str,
    ) -> tollgate_ssh::Result<CommandOutput> {
        if self.fail_at == Some(FailAt::Exec) {
            return Err(Self::refused(target));
        }
        self.calls.lock().unwrap().push(RemoteCall::Exec {
            user: target.user.clone(),
            host: target.host,
            command: command.to_string(),
        });
        Ok(CommandOutput::default())
    }
}

/// MemoryStorage wrapper that counts reads and writes and can be told to
/// fail them.
#[derive(Default)]
pub struct RecordingStorage {
    inner: MemoryStorage,
    reads: AtomicUsize,
    writes: AtomicUsize,
    creates: AtomicUsize,
    fail_reads: AtomicBool,
    fail_creates: AtomicBool,
}

impl RecordingStorage {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Calls to `create_if_absent`, successful or not.
    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.reads.store(0, Ordering::SeqCst);
        self.writes.store(0, Ordering::SeqCst);
        self.creates.store(0, Ordering::SeqCst);
    }

    /// Make every `get` fail.
    pub fn fail_reads(&self) {
        self.fail_reads.store(true, Ordering::SeqCst);
    }

    /// Make every `create_if_absent` fail.
    pub fn fail_creates(&self) {
        self.fail_creates.store(true, Ordering::SeqCst);
    }

    fn unavailable() -> StorageError {
        StorageError::Unavailable("disk on fire".to_string())
    }
}

#[async_trait]
impl Storage for RecordingStorage {
    async fn get(&self, key: &str) -> Result<Option<StorageEntry>, StorageError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        self.inner.get(key).await
    }

    async fn put(&self, entry: StorageEntry) -> Result<(), StorageError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.put(entry).await
    }

    async fn create_if_absent(&self, entry: StorageEntry) -> Result<bool, StorageError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.creates.fetch_add(1, Ordering::SeqCst);
        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        self.inner.create_if_absent(entry).await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.list(prefix).await
    }
}

pub fn otp_role(cidrs: &str) -> RoleEntry {
    RoleEntry {
        default_user: "deploy".to_string(),
        cidr_list: cidrs.to_string(),
        key_type: "otp".to_string(),
        ..Default::default()
    }
}

pub fn dynamic_role(cidrs: &str) -> RoleEntry {
    RoleEntry {
        default_user: "deploy".to_string(),
        cidr_list: cidrs.to_string(),
        key_type: "dynamic".to_string(),
        admin_user: "admin".to_string(),
        key_name: "shared".to_string(),
        port: Some(2222),
        key_bits: Some(2048),
        install_script: "#!/bin/bash\necho installing\n".to_string(),
        ..Default::default()
    }
}

pub fn backend(storage: Arc<dyn Storage>, remote: Arc<dyn RemoteHost>) -> CredsBackend {
    CredsBackend::new(
        storage,
        Salt::new("integration-salt"),
        remote,
        IssuerSettings::default(),
    )
}

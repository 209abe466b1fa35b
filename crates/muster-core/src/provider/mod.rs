//! Collaborator interfaces to the external cloud.
//!
//! The core never talks to a cloud directly; it goes through these
//! object-safe traits. Two implementations ship with the crate: an HTTP/JSON
//! gateway client ([`http::HttpProvider`]) and an in-memory provider used by
//! tests and `--provider memory` dev runs ([`memory::MemoryProvider`]).

pub mod http;
pub mod memory;

use serde::{Deserialize, Serialize};

use crate::dns::{ChangeBatch, ZoneSnapshot};
use crate::error::Result;
use crate::fleet::Instance;

/// A provisioning request: run `count` instances of an image at a size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRequest {
    pub image: String,
    pub size: String,
    pub count: u32,
    #[serde(default)]
    pub placement: Option<String>,
    #[serde(default)]
    pub key_name: Option<String>,
}

/// A group of instances returned together by a single provisioning request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    pub id: String,
    pub instance_ids: Vec<String>,
}

/// A block-storage volume to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeSpec {
    pub size_gib: u32,
}

/// Compute API: instance listing, lifecycle, provisioning, volumes, tags.
pub trait ComputeApi {
    fn list_instances(&self) -> Result<Vec<Instance>>;

    fn start_instances(&self, ids: &[String]) -> Result<()>;

    fn stop_instances(&self, ids: &[String]) -> Result<()>;

    fn run_instances(&self, request: &RunRequest) -> Result<Reservation>;

    /// The most current instances of a reservation.
    fn reservation_instances(&self, reservation_id: &str) -> Result<Vec<Instance>>;

    fn tag_instance(&self, id: &str, key: &str, value: &str) -> Result<()>;

    fn create_volume(&self, spec: VolumeSpec) -> Result<String>;

    fn attach_volume(&self, volume_id: &str, instance_id: &str, device: &str) -> Result<()>;
}

/// Zone API: fetch all record sets; submit one atomic change batch.
pub trait ZoneApi {
    fn fetch_zone(&self, zone: &str) -> Result<ZoneSnapshot>;

    /// Apply the batch all-or-nothing. A stale DELETE or duplicate CREATE
    /// rejects every change in the batch.
    fn commit(&self, zone: &str, batch: &ChangeBatch) -> Result<()>;
}

/// Load-balancer API: membership listing and bulk register/deregister.
pub trait BalancerApi {
    fn members(&self, balancer: &str) -> Result<Vec<String>>;

    fn register(&self, balancer: &str, ids: &[String]) -> Result<()>;

    fn deregister(&self, balancer: &str, ids: &[String]) -> Result<()>;
}

/// A full provider implements all three collaborator interfaces.
pub trait Provider: ComputeApi + ZoneApi + BalancerApi {}

impl<T: ComputeApi + ZoneApi + BalancerApi> Provider for T {}

//! HTTP/JSON gateway implementation of the provider traits.
//!
//! Talks to a cloud gateway exposing the compute/zone/balancer surface as a
//! small REST API. Transport failures and unexpected statuses surface as
//! errors immediately; a rejected change batch (HTTP 409/422) maps to
//! [`Error::CommitRejected`] and a 404 to [`Error::NotFound`].

use anyhow::Context;
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::dns::{Change, ChangeBatch, RecordSet, ZoneSnapshot};
use crate::error::{Error, Result};
use crate::fleet::Instance;

use super::{BalancerApi, ComputeApi, Reservation, RunRequest, VolumeSpec, ZoneApi};

const USER_AGENT: &str = concat!("muster/", env!("CARGO_PKG_VERSION"));

#[derive(Debug)]
pub struct HttpProvider {
    base: String,
    token: Option<String>,
    client: Client,
}

impl HttpProvider {
    /// Build a provider for the gateway at `endpoint`, optionally sending
    /// `token` as a bearer credential.
    pub fn new(endpoint: &Url, token: Option<String>) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(HttpProvider {
            base: endpoint.as_str().trim_end_matches('/').to_string(),
            token,
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    fn get(&self, path: &str, kind: &'static str, name: &str) -> Result<Response> {
        let url = self.url(path);
        let mut request = self.client.get(&url);
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .with_context(|| format!("Failed to reach gateway at {url}"))?;
        check(response, kind, name)
    }

    fn post<B: Serialize>(
        &self,
        path: &str,
        body: &B,
        kind: &'static str,
        name: &str,
    ) -> Result<Response> {
        let url = self.url(path);
        let mut request = self.client.post(&url).json(body);
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .with_context(|| format!("Failed to reach gateway at {url}"))?;
        check(response, kind, name)
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        kind: &'static str,
        name: &str,
    ) -> Result<T> {
        let response = self.get(path, kind, name)?;
        Ok(response
            .json()
            .context("Failed to parse gateway response")?)
    }
}

/// Map gateway statuses onto domain errors.
fn check(response: Response, kind: &'static str, name: &str) -> Result<Response> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(Error::not_found(kind, name));
    }
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        return Err(anyhow::anyhow!("gateway returned HTTP {status}: {body}").into());
    }
    Ok(response)
}

// --- Wire types ---

#[derive(Deserialize)]
struct InstancesResponse {
    instances: Vec<Instance>,
}

#[derive(Deserialize)]
struct RecordsResponse {
    records: Vec<RecordSet>,
}

#[derive(Deserialize)]
struct MembersResponse {
    ids: Vec<String>,
}

#[derive(Serialize)]
struct IdsRequest<'a> {
    ids: &'a [String],
}

#[derive(Serialize)]
struct TagRequest<'a> {
    key: &'a str,
    value: &'a str,
}

#[derive(Deserialize)]
struct VolumeResponse {
    id: String,
}

#[derive(Serialize)]
struct AttachRequest<'a> {
    instance_id: &'a str,
    device: &'a str,
}

#[derive(Serialize)]
struct ChangesRequest<'a> {
    changes: &'a [Change],
}

impl ComputeApi for HttpProvider {
    fn list_instances(&self) -> Result<Vec<Instance>> {
        let response: InstancesResponse = self.get_json("/v1/instances", "compute", "instances")?;
        Ok(response.instances)
    }

    fn start_instances(&self, ids: &[String]) -> Result<()> {
        self.post("/v1/instances/start", &IdsRequest { ids }, "instance", "batch")?;
        Ok(())
    }

    fn stop_instances(&self, ids: &[String]) -> Result<()> {
        self.post("/v1/instances/stop", &IdsRequest { ids }, "instance", "batch")?;
        Ok(())
    }

    fn run_instances(&self, request: &RunRequest) -> Result<Reservation> {
        let response = self.post("/v1/instances/run", request, "image", &request.image)?;
        Ok(response
            .json()
            .context("Failed to parse reservation response")?)
    }

    fn reservation_instances(&self, reservation_id: &str) -> Result<Vec<Instance>> {
        let response: InstancesResponse = self.get_json(
            &format!("/v1/reservations/{reservation_id}"),
            "reservation",
            reservation_id,
        )?;
        Ok(response.instances)
    }

    fn tag_instance(&self, id: &str, key: &str, value: &str) -> Result<()> {
        self.post(
            &format!("/v1/instances/{id}/tags"),
            &TagRequest { key, value },
            "instance",
            id,
        )?;
        Ok(())
    }

    fn create_volume(&self, spec: VolumeSpec) -> Result<String> {
        let response = self.post("/v1/volumes", &spec, "volume", "new")?;
        let volume: VolumeResponse = response
            .json()
            .context("Failed to parse volume response")?;
        Ok(volume.id)
    }

    fn attach_volume(&self, volume_id: &str, instance_id: &str, device: &str) -> Result<()> {
        self.post(
            &format!("/v1/volumes/{volume_id}/attach"),
            &AttachRequest {
                instance_id,
                device,
            },
            "volume",
            volume_id,
        )?;
        Ok(())
    }
}

impl ZoneApi for HttpProvider {
    fn fetch_zone(&self, zone: &str) -> Result<ZoneSnapshot> {
        let response: RecordsResponse =
            self.get_json(&format!("/v1/zones/{zone}/records"), "zone", zone)?;
        Ok(ZoneSnapshot::new(zone, response.records))
    }

    fn commit(&self, zone: &str, batch: &ChangeBatch) -> Result<()> {
        let url = self.url(&format!("/v1/zones/{zone}/changes"));
        let mut request = self.client.post(&url).json(&ChangesRequest {
            changes: batch.changes(),
        });
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .with_context(|| format!("Failed to reach gateway at {url}"))?;

        let status = response.status();
        if status == StatusCode::CONFLICT || status == StatusCode::UNPROCESSABLE_ENTITY {
            let reason = response.text().unwrap_or_default();
            return Err(Error::rejected(reason));
        }
        check(response, "zone", zone)?;
        Ok(())
    }
}

impl BalancerApi for HttpProvider {
    fn members(&self, balancer: &str) -> Result<Vec<String>> {
        let response: MembersResponse = self.get_json(
            &format!("/v1/balancers/{balancer}/members"),
            "balancer",
            balancer,
        )?;
        Ok(response.ids)
    }

    fn register(&self, balancer: &str, ids: &[String]) -> Result<()> {
        self.post(
            &format!("/v1/balancers/{balancer}/register"),
            &IdsRequest { ids },
            "balancer",
            balancer,
        )?;
        Ok(())
    }

    fn deregister(&self, balancer: &str, ids: &[String]) -> Result<()> {
        self.post(
            &format!("/v1/balancers/{balancer}/deregister"),
            &IdsRequest { ids },
            "balancer",
            balancer,
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_loses_trailing_slash() {
        let endpoint = Url::parse("https://gateway.example.net/").unwrap();
        let provider = HttpProvider::new(&endpoint, None).unwrap();
        assert_eq!(
            provider.url("/v1/instances"),
            "https://gateway.example.net/v1/instances"
        );
    }
}

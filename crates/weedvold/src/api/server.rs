//! Docker volume plugin HTTP handlers.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use tower_http::trace::TraceLayer;
use weedvol::VolumeDriver;
use weedvol_common::VolumeError;

use super::protocol::{
    ActivateResponse, CapabilitiesResponse, CreateRequest, ErrResponse, GetResponse,
    ListResponse, MountRequest, MountpointResponse, NameRequest, VolumeBody,
};

type Driver = State<Arc<VolumeDriver>>;

pub fn app(driver: Arc<VolumeDriver>) -> Router {
    Router::new()
        .route("/Plugin.Activate", post(activate))
        .route("/VolumeDriver.Create", post(create))
        .route("/VolumeDriver.Remove", post(remove))
        .route("/VolumeDriver.Path", post(path))
        .route("/VolumeDriver.Mount", post(mount))
        .route("/VolumeDriver.Unmount", post(unmount))
        .route("/VolumeDriver.Get", post(get))
        .route("/VolumeDriver.List", post(list))
        .route("/VolumeDriver.Capabilities", post(capabilities))
        .layer(TraceLayer::new_for_http())
        .with_state(driver)
}

/// Failure answered with `{"Err": ...}`.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Volume(VolumeError),
}

impl From<VolumeError> for ApiError {
    fn from(err: VolumeError) -> Self {
        Self::Volume(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, err) = match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            Self::Volume(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        };
        (status, Json(ErrResponse { err })).into_response()
    }
}

/// Decode a JSON body whatever its content type; empty bodies decode to the default.
fn decode<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("invalid request: {e}")))
}

async fn activate() -> Json<ActivateResponse> {
    Json(ActivateResponse {
        implements: vec!["VolumeDriver".to_string()],
    })
}

async fn create(State(driver): Driver, body: Bytes) -> Result<Json<ErrResponse>, ApiError> {
    let req: CreateRequest = decode(&body)?;
    driver
        .create(&req.name, &req.opts.unwrap_or_default())
        .await?;
    Ok(Json(ErrResponse::default()))
}

async fn remove(State(driver): Driver, body: Bytes) -> Result<Json<ErrResponse>, ApiError> {
    let req: NameRequest = decode(&body)?;
    driver.remove(&req.name).await?;
    Ok(Json(ErrResponse::default()))
}

async fn path(State(driver): Driver, body: Bytes) -> Result<Json<MountpointResponse>, ApiError> {
    let req: NameRequest = decode(&body)?;
    let mountpoint = driver.path(&req.name).await?;
    Ok(Json(MountpointResponse {
        mountpoint: mountpoint.display().to_string(),
        err: String::new(),
    }))
}

async fn mount(State(driver): Driver, body: Bytes) -> Result<Json<MountpointResponse>, ApiError> {
    let req: MountRequest = decode(&body)?;
    tracing::debug!(volume = %req.name, caller = %req.id, "Mount requested");
    let mountpoint = driver.mount(&req.name).await?;
    Ok(Json(MountpointResponse {
        mountpoint: mountpoint.display().to_string(),
        err: String::new(),
    }))
}

async fn unmount(State(driver): Driver, body: Bytes) -> Result<Json<ErrResponse>, ApiError> {
    let req: MountRequest = decode(&body)?;
    tracing::debug!(volume = %req.name, caller = %req.id, "Unmount requested");
    driver.unmount(&req.name).await?;
    Ok(Json(ErrResponse::default()))
}

async fn get(State(driver): Driver, body: Bytes) -> Result<Json<GetResponse>, ApiError> {
    let req: NameRequest = decode(&body)?;
    let volume = driver.inspect(&req.name).await?;
    Ok(Json(GetResponse {
        volume: VolumeBody::detailed(&volume),
        err: String::new(),
    }))
}

async fn list(State(driver): Driver) -> Json<ListResponse> {
    let volumes = driver
        .list()
        .await
        .iter()
        .map(|v| VolumeBody::summary(&v.name, &v.mountpoint))
        .collect();
    Json(ListResponse {
        volumes,
        err: String::new(),
    })
}

async fn capabilities(State(driver): Driver) -> Json<CapabilitiesResponse> {
    Json(CapabilitiesResponse {
        capabilities: driver.capabilities(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashSet;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;
    use weedvol::DriverConfig;
    use weedvol::mount::{MountCommand, MountLauncher, MountProbe, ProbeSchedule, Unmounter};
    use weedvol_common::VolResult;

    /// Mounts appear as soon as they are launched.
    #[derive(Default)]
    struct InstantMounts(Mutex<HashSet<PathBuf>>);

    impl MountLauncher for InstantMounts {
        fn launch(&self, command: &MountCommand) -> VolResult<()> {
            self.0.lock().insert(command.mountpoint.clone());
            Ok(())
        }
    }

    impl MountProbe for InstantMounts {
        fn is_mounted(&self, path: &Path) -> VolResult<bool> {
            Ok(self.0.lock().contains(path))
        }
    }

    impl Unmounter for InstantMounts {
        fn unmount(&self, path: &Path) -> VolResult<()> {
            self.0.lock().remove(path);
            Ok(())
        }
    }

    fn driver(temp: &TempDir) -> Arc<VolumeDriver> {
        let mounts = Arc::new(InstantMounts::default());
        let config = DriverConfig::default()
            .with_root(temp.path())
            .with_probe_schedule(ProbeSchedule::immediate(5));
        Arc::new(
            VolumeDriver::with_parts(config, mounts.clone(), mounts.clone(), mounts).unwrap(),
        )
    }

    fn body(json: &str) -> Bytes {
        Bytes::from(json.to_string())
    }

    async fn error_body(err: ApiError) -> (StatusCode, ErrResponse) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn activate_announces_volume_driver() {
        let Json(resp) = activate().await;
        assert_eq!(resp.implements, vec!["VolumeDriver"]);
    }

    #[tokio::test]
    async fn capabilities_are_local() {
        let temp = TempDir::new().unwrap();
        let Json(resp) = capabilities(State(driver(&temp))).await;
        assert_eq!(
            serde_json::to_value(&resp).unwrap(),
            serde_json::json!({"Capabilities": {"Scope": "local"}})
        );
    }

    #[tokio::test]
    async fn volume_round_trip() {
        let temp = TempDir::new().unwrap();
        let driver = driver(&temp);

        create(
            State(driver.clone()),
            body(r#"{"Name":"v1","Opts":{"host":"filer:8888","filerpath":"/data"}}"#),
        )
        .await
        .unwrap();

        let Json(mounted) = mount(State(driver.clone()), body(r#"{"Name":"v1","ID":"abc"}"#))
            .await
            .unwrap();
        assert!(mounted.mountpoint.ends_with("eaedb746c10d254cf996dfa4bb4153eb"));
        assert!(mounted.err.is_empty());

        let Json(found) = path(State(driver.clone()), body(r#"{"Name":"v1"}"#))
            .await
            .unwrap();
        assert_eq!(found.mountpoint, mounted.mountpoint);

        let Json(got) = get(State(driver.clone()), body(r#"{"Name":"v1"}"#))
            .await
            .unwrap();
        assert_eq!(got.volume.name, "v1");
        assert_eq!(got.volume.status.unwrap()["connections"], 1);

        let Json(listed) = list(State(driver.clone())).await;
        assert_eq!(listed.volumes.len(), 1);
        assert!(listed.volumes[0].status.is_none());

        unmount(State(driver.clone()), body(r#"{"Name":"v1","ID":"abc"}"#))
            .await
            .unwrap();
        remove(State(driver.clone()), body(r#"{"Name":"v1"}"#))
            .await
            .unwrap();

        let Json(listed) = list(State(driver)).await;
        assert!(listed.volumes.is_empty());
    }

    #[tokio::test]
    async fn missing_option_is_reported_in_err() {
        let temp = TempDir::new().unwrap();
        let err = create(
            State(driver(&temp)),
            body(r#"{"Name":"v1","Opts":{"filerpath":"/data"}}"#),
        )
        .await
        .unwrap_err();

        let (status, resp) = error_body(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(resp.err, "'host' option required");
    }

    #[tokio::test]
    async fn null_opts_are_missing_options() {
        let temp = TempDir::new().unwrap();
        let err = create(State(driver(&temp)), body(r#"{"Name":"v1","Opts":null}"#))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Volume(VolumeError::MissingOption { .. })));
    }

    #[tokio::test]
    async fn malformed_body_is_bad_request() {
        let temp = TempDir::new().unwrap();
        let err = remove(State(driver(&temp)), body("{\"Name\":"))
            .await
            .unwrap_err();

        let (status, resp) = error_body(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(resp.err.starts_with("invalid request"));
    }

    #[tokio::test]
    async fn unknown_volume_mount_fails() {
        let temp = TempDir::new().unwrap();
        let err = mount(State(driver(&temp)), body(r#"{"Name":"missing"}"#))
            .await
            .unwrap_err();

        let (_, resp) = error_body(err).await;
        assert_eq!(resp.err, "volume missing not found");
    }

    #[test]
    fn empty_body_decodes_to_default() {
        let req: NameRequest = decode(&Bytes::new()).unwrap();
        assert!(req.name.is_empty());
    }
}

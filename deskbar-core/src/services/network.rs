//! NetworkManager state and actions
//!
//! [`NetworkService::watch`] follows `nmcli monitor`; every burst of events
//! takes a fresh [`NetworkSnapshot`] from the backend and updates only the
//! properties whose value changed. All backend calls are awaited, so a slow
//! `nmcli` never stalls the caller's loop. Actions never surface errors;
//! failures are logged.

use std::cell::{Cell, RefCell};
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use tracing::Instrument;

use crate::error::{BackendError, BackendResult};
use crate::observable::Property;
use crate::services::command::{ACTIVATION_TIMEOUT, Invocation};
use crate::services::feed::{ChangeFeed, LineFeed};
use crate::tracing::{field_names, span_names};

static ADDED_UUID_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(([0-9a-fA-F-]{36})\)").expect("ADDED_UUID_REGEX is a valid regex pattern")
});

const LOOPBACK: &str = "lo";

/// A saved or active connection profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    /// Profile name
    pub name: String,
    /// Profile UUID
    pub uuid: String,
    /// NetworkManager type, e.g. `802-11-wireless`
    pub kind: String,
    /// Device the profile is active on
    pub device: Option<String>,
    /// Network name of a wifi profile
    pub ssid: Option<String>,
}

impl Connection {
    /// Wifi profile
    #[must_use]
    pub fn is_wireless(&self) -> bool {
        self.kind.contains("wireless")
    }

    /// Wired profile
    #[must_use]
    pub fn is_ethernet(&self) -> bool {
        self.kind.contains("ethernet")
    }
}

/// A visible wifi access point
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPoint {
    /// Network name
    pub ssid: String,
    /// Hardware address
    pub bssid: String,
    /// Signal strength 0-100
    pub signal: u8,
    /// Whether a key is required
    pub secured: bool,
    /// Whether this is the access point currently in use
    pub in_use: bool,
}

/// What the bar icon shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrimaryConnectionType {
    /// Wifi carries the default route
    Wireless,
    /// Wired network carries the default route
    Ethernet,
    /// Nothing usable is active
    #[default]
    Disconnected,
}

impl PrimaryConnectionType {
    /// Classifies a connection
    #[must_use]
    pub fn of(connection: &Connection) -> Self {
        if connection.is_wireless() {
            Self::Wireless
        } else if connection.is_ethernet() {
            Self::Ethernet
        } else {
            Self::Disconnected
        }
    }

    /// Icon name for the bar
    #[must_use]
    pub const fn icon_name(self) -> &'static str {
        match self {
            Self::Wireless => "network-wireless-symbolic",
            Self::Ethernet => "network-wired-symbolic",
            Self::Disconnected => "network-offline-symbolic",
        }
    }
}

/// Everything the service shows, read in one go
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NetworkSnapshot {
    /// Wifi radio switch
    pub wifi_enabled: bool,
    /// Interface of the wifi device in use, if any
    pub wifi_device: Option<String>,
    /// Saved profiles
    pub connections: Vec<Connection>,
    /// Active profiles
    pub active_connections: Vec<Connection>,
    /// Connection holding the default route
    pub primary: Option<Connection>,
    /// Access points seen by the wifi device
    pub access_points: Vec<AccessPoint>,
}

impl NetworkSnapshot {
    /// Whether any wifi device exists
    #[must_use]
    pub const fn has_wifi_device(&self) -> bool {
        self.wifi_device.is_some()
    }
}

/// Access to NetworkManager
#[async_trait(?Send)]
pub trait NetworkBackend {
    /// Reads the full state
    ///
    /// # Errors
    ///
    /// Returns a backend error if NetworkManager cannot be queried.
    async fn snapshot(&self) -> BackendResult<NetworkSnapshot>;

    /// Starts following NetworkManager events
    ///
    /// # Errors
    ///
    /// Returns a backend error if the monitor cannot be started.
    fn watch(&self) -> BackendResult<Box<dyn ChangeFeed>>;

    /// Switches the wifi radio
    ///
    /// # Errors
    ///
    /// Returns a backend error if the command fails.
    async fn set_wireless_enabled(&self, enabled: bool) -> BackendResult<()>;

    /// Brings a profile up
    ///
    /// # Errors
    ///
    /// Returns a backend error if the command fails.
    async fn activate(&self, uuid: &str) -> BackendResult<()>;

    /// Takes a profile down
    ///
    /// # Errors
    ///
    /// Returns a backend error if the command fails.
    async fn deactivate(&self, uuid: &str) -> BackendResult<()>;

    /// Deletes a profile
    ///
    /// # Errors
    ///
    /// Returns a backend error if the command fails.
    async fn delete(&self, uuid: &str) -> BackendResult<()>;

    /// Creates and activates a wifi profile on `device`
    ///
    /// # Errors
    ///
    /// Returns a backend error if the command fails.
    async fn add_wifi(&self, ssid: &str, password: Option<&str>, device: &str) -> BackendResult<()>;

    /// Asks `device` to rescan
    ///
    /// # Errors
    ///
    /// Returns a backend error if the command fails.
    async fn request_scan(&self, device: &str) -> BackendResult<()>;
}

/// Backend driving `nmcli` in terse mode
#[derive(Debug, Clone)]
pub struct NmcliBackend {
    default_wifi_interface: String,
}

const NMCLI: &str = "nmcli";

impl NmcliBackend {
    /// Prefers `default_wifi_interface` when several wifi devices exist
    #[must_use]
    pub fn new(default_wifi_interface: impl Into<String>) -> Self {
        Self {
            default_wifi_interface: default_wifi_interface.into(),
        }
    }

    async fn nmcli<const N: usize>(args: [&str; N]) -> BackendResult<String> {
        Invocation::new(NMCLI, args).run().await
    }

    async fn read_snapshot(&self) -> BackendResult<NetworkSnapshot> {
        let wifi_devices = parse_wifi_devices(&Self::nmcli(["-t", "-f", "DEVICE,TYPE", "device"]).await?);
        let wifi_device = wifi_devices
            .iter()
            .find(|d| **d == self.default_wifi_interface)
            .or_else(|| wifi_devices.first())
            .cloned();

        let wifi_enabled =
            wifi_device.is_some() && parse_radio(&Self::nmcli(["-t", "radio", "wifi"]).await?)?;

        let mut profiles = parse_connections(
            &Self::nmcli(["-t", "-f", "NAME,UUID,TYPE,DEVICE,ACTIVE", "connection", "show"]).await?,
        );
        for (connection, _) in profiles.iter_mut().filter(|(c, _)| c.is_wireless()) {
            let uuid = connection.uuid.clone();
            match Self::nmcli(["-t", "-g", "802-11-wireless.ssid", "connection", "show", "uuid", uuid.as_str()])
                .await
            {
                Ok(output) => connection.ssid = parse_ssid_value(&output),
                Err(e) => tracing::debug!(%e, name = %connection.name, "No SSID for profile"),
            }
        }
        let connections: Vec<Connection> = profiles.iter().map(|(c, _)| c.clone()).collect();
        let active_connections: Vec<Connection> = profiles
            .into_iter()
            .filter_map(|(c, active)| active.then_some(c))
            .collect();

        let access_points = match &wifi_device {
            Some(device) if wifi_enabled => parse_access_points(
                &Self::nmcli([
                    "-t", "-f", "IN-USE,BSSID,SSID,SIGNAL,SECURITY", "device", "wifi", "list",
                    "ifname", device.as_str(), "--rescan", "no",
                ])
                .await?,
            ),
            _ => Vec::new(),
        };

        let primary = select_primary(&active_connections);
        Ok(NetworkSnapshot {
            wifi_enabled,
            wifi_device,
            connections,
            active_connections,
            primary,
            access_points,
        })
    }
}

#[async_trait(?Send)]
impl NetworkBackend for NmcliBackend {
    async fn snapshot(&self) -> BackendResult<NetworkSnapshot> {
        self.read_snapshot()
            .instrument(crate::trace_operation!(span_names::NETWORK_REFRESH))
            .await
    }

    fn watch(&self) -> BackendResult<Box<dyn ChangeFeed>> {
        let feed = LineFeed::spawn(NMCLI, &["monitor"], |line| !line.trim().is_empty())?;
        Ok(Box::new(feed))
    }

    async fn set_wireless_enabled(&self, enabled: bool) -> BackendResult<()> {
        let state = if enabled { "on" } else { "off" };
        Self::nmcli(["radio", "wifi", state]).await.map(|_| ())
    }

    async fn activate(&self, uuid: &str) -> BackendResult<()> {
        Invocation::new(NMCLI, ["connection", "up", "uuid", uuid])
            .with_timeout(ACTIVATION_TIMEOUT)
            .run()
            .await
            .map(|_| ())
    }

    async fn deactivate(&self, uuid: &str) -> BackendResult<()> {
        Self::nmcli(["connection", "down", "uuid", uuid]).await.map(|_| ())
    }

    async fn delete(&self, uuid: &str) -> BackendResult<()> {
        Self::nmcli(["connection", "delete", "uuid", uuid]).await.map(|_| ())
    }

    async fn add_wifi(&self, ssid: &str, password: Option<&str>, device: &str) -> BackendResult<()> {
        let Some(password) = password else {
            return open_wifi_invocation(ssid, device).run().await.map(|_| ());
        };

        let added = secured_wifi_add_invocation(ssid, device).run().await?;
        let uuid = parse_added_uuid(&added).ok_or_else(|| BackendError::Parse {
            command: NMCLI,
            output: added.clone(),
        })?;
        if let Err(e) = wifi_up_invocation(&uuid, device, password).run().await {
            // A profile that never came up would shadow the network later
            if let Err(cleanup) = self.delete(&uuid).await {
                tracing::warn!(%cleanup, %uuid, "Could not remove unused wifi profile");
            }
            return Err(e);
        }
        Ok(())
    }

    async fn request_scan(&self, device: &str) -> BackendResult<()> {
        Self::nmcli(["device", "wifi", "rescan", "ifname", device]).await.map(|_| ())
    }
}

/// Joins an open network in one step
#[must_use]
pub fn open_wifi_invocation(ssid: &str, device: &str) -> Invocation {
    Invocation::new(NMCLI, ["device", "wifi", "connect", ssid, "ifname", device])
        .with_timeout(ACTIVATION_TIMEOUT)
}

/// Creates a WPA profile for `ssid` without its key
#[must_use]
pub fn secured_wifi_add_invocation(ssid: &str, device: &str) -> Invocation {
    Invocation::new(
        NMCLI,
        [
            "connection", "add", "type", "wifi", "con-name", ssid, "ifname", device,
            "ssid", ssid, "wifi-sec.key-mgmt", "wpa-psk",
        ],
    )
}

/// Activates a new profile, handing the key over stdin as a `passwd-file`
#[must_use]
pub fn wifi_up_invocation(uuid: &str, device: &str, password: &str) -> Invocation {
    Invocation::new(
        NMCLI,
        ["connection", "up", "uuid", uuid, "ifname", device, "passwd-file", "/dev/stdin"],
    )
    .with_stdin(format!("802-11-wireless-security.psk:{password}\n"))
    .with_timeout(ACTIVATION_TIMEOUT)
}

/// UUID from `Connection 'name' (uuid) successfully added.`
#[must_use]
pub fn parse_added_uuid(output: &str) -> Option<String> {
    ADDED_UUID_REGEX
        .captures(output)
        .map(|c| c[1].to_string())
}

/// Value of `nmcli -g 802-11-wireless.ssid`
#[must_use]
pub fn parse_ssid_value(output: &str) -> Option<String> {
    split_terse(output.trim())
        .into_iter()
        .next()
        .filter(|ssid| !ssid.is_empty())
}

/// NetworkManager gives wired links a lower route metric, so an active
/// ethernet profile wins over wifi.
fn select_primary(active: &[Connection]) -> Option<Connection> {
    active
        .iter()
        .find(|c| c.is_ethernet())
        .or_else(|| active.iter().find(|c| c.is_wireless()))
        .cloned()
}

/// Splits one line of `nmcli -t` output on unescaped colons
#[must_use]
pub fn split_terse(line: &str) -> Vec<String> {
    let mut fields = vec![String::new()];
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(next) = chars.next()
                    && let Some(field) = fields.last_mut()
                {
                    field.push(next);
                }
            }
            ':' => fields.push(String::new()),
            c => {
                if let Some(field) = fields.last_mut() {
                    field.push(c);
                }
            }
        }
    }
    fields
}

/// Parses `NAME,UUID,TYPE,DEVICE,ACTIVE` rows
#[must_use]
pub fn parse_connections(output: &str) -> Vec<(Connection, bool)> {
    output
        .lines()
        .filter(|l| !l.trim().is_empty())
        .filter_map(|line| {
            let fields = split_terse(line);
            let [name, uuid, kind, device, active] = <[String; 5]>::try_from(fields).ok()?;
            let device = (!device.is_empty() && device != "--").then_some(device);
            Some((
                Connection {
                    name,
                    uuid,
                    kind,
                    device,
                    ssid: None,
                },
                active == "yes",
            ))
        })
        .collect()
}

/// Parses `IN-USE,BSSID,SSID,SIGNAL,SECURITY` rows, skipping hidden networks
#[must_use]
pub fn parse_access_points(output: &str) -> Vec<AccessPoint> {
    output
        .lines()
        .filter_map(|line| {
            let fields = split_terse(line);
            let [in_use, bssid, ssid, signal, security] = <[String; 5]>::try_from(fields).ok()?;
            if ssid.is_empty() {
                return None;
            }
            let security = security.trim();
            Some(AccessPoint {
                ssid,
                bssid,
                signal: signal.trim().parse().unwrap_or(0),
                secured: !security.is_empty() && security != "--",
                in_use: in_use.trim() == "*",
            })
        })
        .collect()
}

/// Interfaces of type `wifi` from `DEVICE,TYPE` rows
#[must_use]
pub fn parse_wifi_devices(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| {
            let fields = split_terse(line);
            match fields.as_slice() {
                [device, kind] if kind == "wifi" => Some(device.clone()),
                _ => None,
            }
        })
        .collect()
}

/// Parses `nmcli -t radio wifi`
///
/// # Errors
///
/// Returns [`BackendError::Parse`] for anything but `enabled`/`disabled`.
pub fn parse_radio(output: &str) -> BackendResult<bool> {
    match output.trim() {
        "enabled" => Ok(true),
        "disabled" => Ok(false),
        other => Err(BackendError::Parse {
            command: NMCLI,
            output: other.to_string(),
        }),
    }
}

/// Observable network state
pub struct NetworkService {
    backend: Box<dyn NetworkBackend>,
    wifi_device: RefCell<Option<String>>,
    refreshing: Cell<bool>,
    refresh_again: Cell<bool>,
    /// Type of the primary connection
    pub primary_connection_type: Property<PrimaryConnectionType>,
    /// Saved profiles, loopback excluded
    pub connections: Property<Vec<Connection>>,
    /// Active profiles, loopback excluded
    pub active_connections: Property<Vec<Connection>>,
    /// First active wifi profile
    pub wifi_connection: Property<Option<Connection>>,
    /// Wifi radio switch
    pub wifi_enabled: Property<bool>,
    /// Visible access points
    pub access_points: Property<Vec<AccessPoint>>,
}

impl std::fmt::Debug for NetworkService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkService")
            .field("primary", &self.primary_connection_type.get())
            .field("wifi_enabled", &self.wifi_enabled.get())
            .finish_non_exhaustive()
    }
}

impl NetworkService {
    /// Creates the service in the disconnected state until the first refresh
    #[must_use]
    pub fn new(backend: Box<dyn NetworkBackend>) -> Self {
        Self {
            backend,
            wifi_device: RefCell::new(None),
            refreshing: Cell::new(false),
            refresh_again: Cell::new(false),
            primary_connection_type: Property::default(),
            connections: Property::default(),
            active_connections: Property::default(),
            wifi_connection: Property::default(),
            wifi_enabled: Property::new(false),
            access_points: Property::default(),
        }
    }

    /// Re-reads the backend and notifies changed properties
    ///
    /// Refreshes never overlap: a call made while one is running makes the
    /// running one read again once it is done, then returns.
    pub async fn refresh(&self) {
        if self.refreshing.replace(true) {
            self.refresh_again.set(true);
            return;
        }
        loop {
            self.refresh_again.set(false);
            match self.backend.snapshot().await {
                Ok(snapshot) => self.apply(snapshot),
                Err(e) => tracing::warn!({ field_names::ERROR } = %e, "Network refresh failed"),
            }
            if !self.refresh_again.get() {
                break;
            }
        }
        self.refreshing.set(false);
    }

    /// Refreshes once, then after every burst of NetworkManager events until
    /// the monitor exits
    pub async fn watch(&self) {
        let mut feed = match self.backend.watch() {
            Ok(feed) => feed,
            Err(e) => {
                tracing::warn!(%e, "Cannot follow NetworkManager events");
                self.refresh().await;
                return;
            }
        };
        self.refresh().await;
        while feed.changed().await {
            self.refresh().await;
        }
        tracing::warn!("NetworkManager monitor stopped");
    }

    /// Applies a snapshot, notifying only properties that differ
    pub fn apply(&self, snapshot: NetworkSnapshot) {
        let not_loopback = |c: &Connection| c.name != LOOPBACK && c.kind != "loopback";
        let connections: Vec<Connection> = snapshot
            .connections
            .into_iter()
            .filter(not_loopback)
            .collect();
        let active: Vec<Connection> = snapshot
            .active_connections
            .into_iter()
            .filter(not_loopback)
            .collect();

        let primary = snapshot
            .primary
            .as_ref()
            .or_else(|| active.first())
            .map_or(PrimaryConnectionType::Disconnected, PrimaryConnectionType::of);
        let wifi_connection = active.iter().find(|c| c.is_wireless()).cloned();

        *self.wifi_device.borrow_mut() = snapshot.wifi_device;
        self.wifi_enabled.set(snapshot.wifi_enabled);
        self.connections.set(connections);
        self.active_connections.set(active);
        self.wifi_connection.set(wifi_connection);
        self.primary_connection_type.set(primary);
        self.access_points.set(snapshot.access_points);
    }

    /// Whether a wifi device exists
    #[must_use]
    pub fn has_wifi_device(&self) -> bool {
        self.wifi_device.borrow().is_some()
    }

    /// Flips the wifi radio; does nothing without a wifi device
    pub async fn toggle_wireless(&self) {
        if !self.has_wifi_device() {
            return;
        }
        let enabled = !self.wifi_enabled.get();
        match self.backend.set_wireless_enabled(enabled).await {
            Ok(()) => {
                self.wifi_enabled.set(enabled);
            }
            Err(e) => tracing::error!(%e, "Failed to switch wifi radio"),
        }
    }

    /// Whether a saved wifi profile exists for the network named `ssid`
    #[must_use]
    pub fn is_access_point_connected(&self, ssid: &str) -> bool {
        self.connections.with(|connections| {
            connections
                .iter()
                .any(|c| c.is_wireless() && c.ssid.as_deref() == Some(ssid))
        })
    }

    /// Creates a profile for `access_point` and activates it, unless a saved
    /// profile for its SSID already exists
    pub async fn connect_to_access_point(&self, access_point: &AccessPoint, password: Option<&str>) {
        if self.is_access_point_connected(&access_point.ssid) {
            return;
        }
        let Some(device) = self.wifi_device.borrow().clone() else {
            tracing::warn!("No wifi device to connect with");
            return;
        };
        let password = password.filter(|_| access_point.secured);
        if let Err(e) = self.backend.add_wifi(&access_point.ssid, password, &device).await {
            tracing::error!(%e, ssid = %access_point.ssid, "Failed to add wifi connection");
        }
    }

    /// Whether `connection` is currently active
    #[must_use]
    pub fn is_connection_active(&self, connection: &Connection) -> bool {
        self.active_connections
            .with(|active| active.iter().any(|c| c.uuid == connection.uuid))
    }

    /// Deactivates an active profile, activates an inactive one
    pub async fn toggle_connection_active(&self, connection: &Connection) {
        let result = if self.is_connection_active(connection) {
            self.backend.deactivate(&connection.uuid).await
        } else {
            self.backend.activate(&connection.uuid).await
        };
        if let Err(e) = result {
            tracing::error!(%e, name = %connection.name, "Failed to toggle connection");
        }
    }

    /// Deletes a saved profile
    pub async fn delete_connection(&self, connection: &Connection) {
        if let Err(e) = self.backend.delete(&connection.uuid).await {
            tracing::error!(%e, name = %connection.name, "Failed to delete connection");
        }
    }

    /// Asks the wifi device to rescan; only while wifi is enabled
    pub async fn request_scan(&self) {
        if !self.wifi_enabled.get() {
            return;
        }
        let Some(device) = self.wifi_device.borrow().clone() else {
            return;
        };
        if let Err(e) = self.backend.request_scan(&device).await {
            tracing::error!(%e, "Wifi scan request failed");
        }
    }
}

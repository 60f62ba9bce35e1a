// Unraid BFF — GraphQL documents
//
// Ordered slices are fallback chains: newest schema first.

pub const PING: &str = "query Ping { __typename }";

pub const RESOLVE_SERVER_NAME: &str =
    "query ResolveServerName { vars { name } info { os { hostname } } }";

pub const OVERVIEW_CORE: [&str; 2] = [
    "query OverviewCore { vars { name version regTy } info { time cpu { brand cores threads speed } os { distro platform kernel hostname uptime } baseboard { manufacturer model } } metrics { cpu { percentTotal } memory { percentTotal used total free } } array { state capacity { kilobytes { used free total } } parityCheckStatus { date duration speed status progress errors running } } }",
    "query OverviewCoreFallback { vars { name version regTy } info { time cpu { brand cores threads speed } os { distro kernel hostname uptime } } metrics { cpu { percentTotal } memory { percentTotal used total free } } array { state capacity { kilobytes { used free total } } parityCheckStatus { status progress errors running } } }",
];

pub const NOTIFICATIONS_OVERVIEW: &str =
    "query OverviewNotificationsOverview { notifications { overview { unread { info warning alert total } } } }";

pub const NOTIFICATIONS_LIST: [&str; 2] = [
    "query OverviewNotificationsList { notifications { warningsAndAlerts { id title importance timestamp description } } }",
    "query OverviewNotificationsListFallback { notifications { list(filter: { type: UNREAD, offset: 0, limit: 25 }) { id title importance timestamp description } } }",
];

pub const NETWORK: &str = "query OverviewNetwork { network { accessUrls { type name ipv4 ipv6 } } }";

pub const UPS: &str = "query OverviewUps { upsDevices { id name model status battery { chargeLevel estimatedRuntime health } power { inputVoltage outputVoltage loadPercentage } } }";

pub const ARRAY: [&str; 2] = [
    "query Array { array { state capacity { kilobytes { used free total } } parityCheckStatus { status progress errors running } parities { id name device type fsType temp size fsUsed fsFree numErrors } disks { id name device type fsType temp size fsUsed fsFree numErrors } caches { id name device type fsType temp size fsUsed fsFree numErrors } } }",
    "query ArrayFallback { array { state capacity { kilobytes { used free total } } parityCheckStatus { status progress errors running } disks { id name fsType temp size fsUsed fsFree numErrors } caches { id name fsType temp size fsUsed fsFree numErrors } } }",
];

pub const DOCKER: [&str; 4] = [
    "query Docker { docker { containers { id names image iconUrl webUiUrl labels status state created autoStart hostConfig { networkMode } ports { privatePort publicPort type } } } }",
    "query Docker { docker { containers { id names image iconUrl labels status state created autoStart hostConfig { networkMode } ports { privatePort publicPort type } } } }",
    "query Docker { docker { containers { id names image webUiUrl labels status state created autoStart hostConfig { networkMode } ports { privatePort publicPort type } } } }",
    "query Docker { docker { containers { id names image labels status state created autoStart hostConfig { networkMode } ports { privatePort publicPort type } } } }",
];

pub const VMS: &str = "query Vms { vms { domains { id name state } } }";

pub const SHARES: &str =
    "query Shares { shares { id name allocator splitLevel size used free cache include exclude } }";

pub const DOCKER_ICON_META: &str =
    "query DockerIconMeta($id: PrefixedID!) { docker { container(id: $id) { names image labels } } }";

// ─── Mutations ───────────────────────────────────────────────────────────────

pub const DOCKER_START: &str =
    "mutation DockerAction($id: PrefixedID!) { docker { start(id: $id) { id } } }";

pub const DOCKER_STOP: &str =
    "mutation DockerAction($id: PrefixedID!) { docker { stop(id: $id) { id } } }";

pub const DOCKER_LEGACY: [&str; 2] = [
    "mutation DockerLegacyAction($id: String!, $action: String!) { dockerContainerAction(id: $id, action: $action) { __typename } }",
    "mutation DockerLegacyAction($id: String!, $action: String!) { dockerAction(id: $id, action: $action) { __typename } }",
];

pub const VM_LEGACY: [&str; 2] = [
    "mutation VmAction($id: String!, $action: String!) { vmAction(id: $id, action: $action) { __typename } }",
    "mutation VmAction($id: String!, $action: String!) { virtualMachineAction(id: $id, action: $action) { __typename } }",
];

pub const ARRAY_SET_STATE: &str = "mutation ArraySetState($desiredState: ArrayStateInputState!) { array { setState(input: { desiredState: $desiredState }) { id } } }";

pub const ARRAY_LEGACY: &str =
    "mutation ArrayAction($action: String!) { arrayAction(action: $action) { __typename } }";

pub const ARCHIVE_NOTIFICATION: &str =
    "mutation ArchiveNotification($id: PrefixedID!) { archiveNotification(id: $id) { id } }";

/// `vm { <field>(id: $id) }` for the current VM schema.
pub fn vm_mutation(field: &str) -> String {
    format!("mutation VmAction($id: PrefixedID!) {{ vm {{ {}(id: $id) }} }}", field)
}

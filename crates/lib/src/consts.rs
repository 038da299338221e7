/// Application name, used for XDG directories and env var prefixes.
pub const APP_NAME: &str = "dockyard";

/// Script executed for a step that names no `exec`.
pub const DEFAULT_SCRIPT_EXEC: &str = "configure";

/// Uid the produced image runs as when the manifest names none.
pub const DEFAULT_IMAGE_USER: u32 = 0;

/// Package manager invocation used when none is configured. Packages land
/// in the working root filesystem, not on the host.
pub const DEFAULT_PACKAGE_MANAGER: &str = "yum install -y --installroot=#rootfs#";

/// Marker in the package manager command replaced with the root filesystem.
pub const ROOTFS_MARKER: &str = "#rootfs#";

/// Directory under the work dir that receives the image root filesystem.
pub const ROOTFS_DIR: &str = "rootfs";

/// File under the work dir that receives the committed image config.
pub const IMAGE_CONFIG_FILE: &str = "image.json";

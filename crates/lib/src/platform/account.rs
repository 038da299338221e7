//! User accounts of the working image.
//!
//! Script identities are uids from the manifest. Their group and home come
//! from the image's own `/etc/passwd`, not the host's.

use std::path::Path;

use tracing::debug;

/// Identity a child process runs under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
  pub uid: u32,
  pub gid: u32,
  pub home: String,
}

impl Account {
  /// Account of `uid` in the image rooted at `rootfs`.
  ///
  /// Without a matching passwd entry the primary group equals the uid and
  /// the home is `/root` for uid 0 and `/` otherwise.
  pub fn lookup(rootfs: &Path, uid: u32) -> Self {
    let passwd = rootfs.join("etc/passwd");
    let found = std::fs::read_to_string(&passwd)
      .ok()
      .and_then(|text| text.lines().find_map(|line| parse_entry(line).filter(|a| a.uid == uid)));

    match found {
      Some(account) => {
        debug!(uid, gid = account.gid, home = %account.home, "using image account");
        account
      }
      None => Self {
        uid,
        gid: uid,
        home: if uid == 0 { "/root" } else { "/" }.to_string(),
      },
    }
  }
}

/// `name:password:uid:gid:gecos:home:shell`
fn parse_entry(line: &str) -> Option<Account> {
  let fields: Vec<&str> = line.split(':').collect();
  if fields.len() < 7 || line.starts_with('#') {
    return None;
  }
  Some(Account {
    uid: fields[2].parse().ok()?,
    gid: fields[3].parse().ok()?,
    home: fields[5].to_string(),
  })
}

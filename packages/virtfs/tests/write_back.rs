//! Write-back and staleness behavior against a scratch copy of a sysfs tree.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use virtfs::{Config, Driver, DriverKind, Error};

struct FakeSysfs {
    tmp: TempDir,
    root: PathBuf,
}

impl FakeSysfs {
    fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("sys");
        let sda = root.join("block").join("sda");
        fs::create_dir_all(sda.join("queue")).unwrap();
        fs::write(sda.join("dev"), "8:0\n").unwrap();
        fs::write(sda.join("capability"), "50\n").unwrap();
        fs::write(sda.join("queue").join("scheduler"), "[mq-deadline] none\n").unwrap();

        let mounts = tmp.path().join("mounts");
        fs::write(
            &mounts,
            format!("none {} sysfs rw,nosuid,nodev 0 0\n", root.display()),
        )
        .unwrap();

        Self { tmp, root }
    }

    fn config(&self) -> Config {
        Config::default()
            .with_mounts_path(self.tmp.path().join("mounts"))
            .with_scratch_root(self.tmp.path().join("scratch"))
    }

    fn driver(&self) -> Driver {
        Driver::mount(DriverKind::SysFs, &self.config()).unwrap()
    }

    fn file(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}

#[test]
fn set_is_visible_before_and_after_save() {
    let fake = FakeSysfs::new();
    let mut sysfs = fake.driver();
    let scheduler = fake.file("block/sda/queue/scheduler");

    let leaf = sysfs
        .walk("block/sda/queue/scheduler")
        .unwrap()
        .as_writable_mut()
        .unwrap();

    leaf.set("none", false).unwrap();
    assert_eq!(leaf.contents().unwrap(), "none");
    assert_eq!(read(&scheduler), "[mq-deadline] none\n");

    leaf.save().unwrap();
    assert_eq!(read(&scheduler), "none");
    assert!(!leaf.is_dirty());
}

#[test]
fn set_child_saves_immediately() {
    let fake = FakeSysfs::new();
    let mut sysfs = fake.driver();

    let queue = sysfs.walk("block/sda/queue").unwrap().as_directory_mut().unwrap();
    queue.set_child("scheduler", "none").unwrap();
    assert_eq!(read(&fake.file("block/sda/queue/scheduler")), "none");

    // The cached leaf reflects the write.
    assert_eq!(
        sysfs.walk("block/sda/queue/scheduler").unwrap().contents().unwrap(),
        "none"
    );
}

#[test]
fn failed_save_leaves_file_unchanged() {
    let fake = FakeSysfs::new();
    let blocker = fake.tmp.path().join("blocker");
    fs::write(&blocker, "").unwrap();
    let config = fake.config().with_scratch_root(&blocker);
    let mut sysfs = Driver::mount(DriverKind::SysFs, &config).unwrap();

    let dev = sysfs.walk("block/sda/dev").unwrap();
    match dev.set("9:0\n") {
        Err(Error::Write { path, .. }) => assert_eq!(path, fake.file("block/sda/dev")),
        other => panic!("Expected write error, got {:?}", other.map(|_| ())),
    }
    assert_eq!(read(&fake.file("block/sda/dev")), "8:0\n");
}

#[test]
fn scratch_space_is_cleaned_up() {
    let fake = FakeSysfs::new();
    let mut sysfs = fake.driver();

    sysfs.walk("block/sda/dev").unwrap().set("9:0\n").unwrap();
    let scratch = fake.tmp.path().join("scratch");
    assert!(scratch.is_dir());
    assert!(fs::read_dir(&scratch).unwrap().next().is_none());
}

#[test]
fn failed_rename_leaves_target_and_no_temp_files() {
    let fake = FakeSysfs::new();
    let mut sysfs = fake.driver();
    let dev = fake.file("block/sda/dev");

    let leaf = sysfs.walk("block/sda/dev").unwrap();
    fs::remove_file(&dev).unwrap();
    fs::create_dir(&dev).unwrap();
    fs::write(dev.join("keep"), "8:0\n").unwrap();

    match leaf.set("9:0\n") {
        Err(Error::Write { path, .. }) => assert_eq!(path, dev),
        other => panic!("Expected write error, got {:?}", other.map(|_| ())),
    }
    assert_eq!(read(&dev.join("keep")), "8:0\n");

    let leftovers: Vec<_> = fs::read_dir(fake.tmp.path().join("scratch"))
        .unwrap()
        .collect();
    assert!(leftovers.is_empty(), "scratch not empty: {:?}", leftovers);
}

#[cfg(unix)]
#[test]
fn shared_scratch_root_is_refused() {
    use std::io::ErrorKind;
    use std::os::unix::fs::PermissionsExt;

    let fake = FakeSysfs::new();
    let scratch = fake.tmp.path().join("scratch");
    fs::create_dir(&scratch).unwrap();
    fs::set_permissions(&scratch, fs::Permissions::from_mode(0o777)).unwrap();
    fs::write(scratch.join("planted"), "").unwrap();
    let mut sysfs = fake.driver();

    let queue = sysfs.walk("block/sda/queue").unwrap();
    match queue.set_child("scheduler", "none") {
        Err(Error::Write { source, .. }) => assert_eq!(source.kind(), ErrorKind::PermissionDenied),
        other => panic!("Expected write error, got {:?}", other.map(|_| ())),
    }
    assert_eq!(read(&fake.file("block/sda/queue/scheduler")), "[mq-deadline] none\n");
    assert!(scratch.join("planted").exists());
}

#[test]
fn removed_target_is_not_recreated() {
    let fake = FakeSysfs::new();
    let mut sysfs = fake.driver();
    let capability = fake.file("block/sda/capability");

    let leaf = sysfs.walk("block/sda/capability").unwrap();
    fs::remove_file(&capability).unwrap();

    assert!(matches!(leaf.set("51\n"), Err(Error::NotFound { .. })));
    assert!(!capability.exists());
}

#[test]
fn leaf_content_is_stale_by_contract() {
    let fake = FakeSysfs::new();
    let mut sysfs = fake.driver();

    let first = sysfs
        .walk("block/sda/capability")
        .unwrap()
        .contents()
        .unwrap()
        .to_string();
    fs::write(fake.file("block/sda/capability"), "51\n").unwrap();
    let second = sysfs
        .walk("block/sda/capability")
        .unwrap()
        .contents()
        .unwrap()
        .to_string();

    assert_eq!(first, "50\n");
    assert_eq!(first, second);

    // A fresh driver sees the live value.
    let mut fresh = fake.driver();
    assert_eq!(
        fresh.walk("block/sda/capability").unwrap().contents().unwrap(),
        "51\n"
    );
}

#[test]
fn listing_is_live_while_navigation_is_cached() {
    let fake = FakeSysfs::new();
    let mut sysfs = fake.driver();

    let sda = sysfs.walk("block/sda").unwrap();
    assert_eq!(
        sda.list_children().unwrap(),
        vec!["capability", "dev", "queue"]
    );
    sda.child("dev").unwrap();

    fs::remove_file(fake.file("block/sda/dev")).unwrap();
    fs::write(fake.file("block/sda/size"), "1953525168\n").unwrap();

    assert_eq!(
        sda.list_children().unwrap(),
        vec!["capability", "queue", "size"]
    );
    assert!(sda.child("dev").is_ok());
}

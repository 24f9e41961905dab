mod common;

use common::RamDisk;
use newfs::*;

fn entries(fs: &mut FileSystem<RamDisk>, path: &str) -> Vec<(String, FileType, u32)> {
    let dir = fs.lookup(path).unwrap().found().unwrap();
    fs.readdir(dir)
        .unwrap()
        .into_iter()
        .map(|c| {
            let d = fs.dentry(c).unwrap();
            (d.name().into_owned(), d.ftype, d.ino)
        })
        .collect()
}

#[test]
fn test_file_survives_remount() {
    let disk = RamDisk::default_disk();
    let mut fs = FileSystem::mount(disk.clone(), Geometry::default()).unwrap();
    let root = fs.root().unwrap();
    let a = fs.create(root, "a", FileType::Directory).unwrap();
    let b = fs.create(a, "b", FileType::Regular).unwrap();
    assert_eq!(fs.write(b, 0, b"0123456789").unwrap(), 10);
    fs.unmount().unwrap();

    let mut fs = FileSystem::mount(disk.clone(), Geometry::default()).unwrap();
    let found = fs.lookup("/a/b").unwrap();
    assert!(found.is_found());
    let b = found.dentry();
    assert_eq!(fs.dentry(b).unwrap().ftype, FileType::Regular);
    assert_eq!(fs.inode(b).unwrap().size, 10);

    let mut buf = [0u8; 32];
    let n = fs.read(b, 0, &mut buf).unwrap();
    assert_eq!(&buf[..n], b"0123456789");
    assert_eq!(fs.usage().unwrap(), 10);
    fs.unmount().unwrap();
}

#[test]
fn test_directory_round_trip() {
    let disk = RamDisk::default_disk();
    let mut fs = FileSystem::mount(disk.clone(), Geometry::default()).unwrap();
    fs.mkdir("/d").unwrap();
    // More children than fit in one block, so the entries spill into a second one.
    for i in 0..10 {
        let ftype = if i % 3 == 0 { FileType::Directory } else { FileType::Regular };
        fs.mknod(&format!("/d/child{}", i), ftype).unwrap();
    }
    let before = entries(&mut fs, "/d");
    assert_eq!(before.len(), 10);
    fs.unmount().unwrap();

    let mut fs = FileSystem::mount(disk.clone(), Geometry::default()).unwrap();
    let after = entries(&mut fs, "/d");
    assert_eq!(after, before);
    log!("after remount:\n{}", fs.dump().unwrap());
}

#[test]
fn test_children_load_lazily() {
    let disk = RamDisk::default_disk();
    let mut fs = FileSystem::mount(disk.clone(), Geometry::default()).unwrap();
    fs.mkdir("/x").unwrap();
    fs.mkdir("/x/y").unwrap();
    fs.unmount().unwrap();

    let mut fs = FileSystem::mount(disk.clone(), Geometry::default()).unwrap();
    let root = fs.root().unwrap();
    let x = fs.readdir(root).unwrap()[0];
    assert!(!fs.dentry(x).unwrap().is_loaded());

    let y = fs.lookup("/x/y").unwrap().found().unwrap();
    assert!(fs.dentry(x).unwrap().is_loaded());
    assert!(fs.dentry(y).unwrap().is_loaded());
    assert_eq!(fs.dentry(y).unwrap().parent(), Some(x));
}

#[test]
fn test_unvisited_subtrees_are_preserved() {
    let disk = RamDisk::default_disk();
    let mut fs = FileSystem::mount(disk.clone(), Geometry::default()).unwrap();
    let a = fs.mknod("/a", FileType::Directory).unwrap();
    let f = fs.create(a, "note", FileType::Regular).unwrap();
    fs.write(f, 3, b"abc").unwrap();
    fs.unmount().unwrap();

    // Second mount never visits /a.
    let mut fs = FileSystem::mount(disk.clone(), Geometry::default()).unwrap();
    fs.mknod("/c", FileType::Regular).unwrap();
    fs.unmount().unwrap();

    let mut fs = FileSystem::mount(disk.clone(), Geometry::default()).unwrap();
    let names: Vec<_> = entries(&mut fs, "/").into_iter().map(|e| e.0).collect();
    assert_eq!(names, vec!["c", "a"]);
    let note = fs.lookup("/a/note").unwrap().found().unwrap();
    let mut buf = [0xffu8; 6];
    assert_eq!(fs.read(note, 0, &mut buf).unwrap(), 6);
    assert_eq!(&buf, b"\0\0\0abc");
}

#[test]
fn test_removal_survives_remount() {
    let disk = RamDisk::default_disk();
    let mut fs = FileSystem::mount(disk.clone(), Geometry::default()).unwrap();
    fs.mknod("/keep", FileType::Regular).unwrap();
    fs.mknod("/drop", FileType::Regular).unwrap();
    let free = fs.free_inodes().unwrap();
    fs.remove("/drop").unwrap();
    fs.unmount().unwrap();

    let mut fs = FileSystem::mount(disk.clone(), Geometry::default()).unwrap();
    assert!(fs.lookup("/keep").unwrap().is_found());
    assert!(!fs.lookup("/drop").unwrap().is_found());
    assert_eq!(fs.free_inodes().unwrap(), free + 1);
}

#[test]
fn test_sync_without_unmount() {
    let disk = RamDisk::default_disk();
    let mut fs = FileSystem::mount(disk.clone(), Geometry::default()).unwrap();
    let f = fs.mknod("/s", FileType::Regular).unwrap();
    fs.write(f, 0, b"synced").unwrap();
    fs.sync().unwrap();
    assert!(fs.is_mounted());

    // Written after the sync and never flushed.
    fs.mknod("/lost", FileType::Regular).unwrap();
    drop(fs);

    let mut fs = FileSystem::mount(disk.clone(), Geometry::default()).unwrap();
    let s = fs.lookup("/s").unwrap().found().unwrap();
    let mut buf = [0u8; 6];
    fs.read(s, 0, &mut buf).unwrap();
    assert_eq!(&buf, b"synced");
    assert!(!fs.lookup("/lost").unwrap().is_found());
}

#[test]
fn test_file_bounds() {
    let mut fs = FileSystem::mount(RamDisk::default_disk(), Geometry::default()).unwrap();
    let f = fs.mknod("/big", FileType::Regular).unwrap();
    let max = fs.superblock().unwrap().max_file_size();
    assert_eq!(max, DATA_PER_FILE * 1024);

    assert_eq!(fs.write(f, max - 1, b"x").unwrap(), 1);
    assert_eq!(fs.write(f, max, b"x"), Err(Error::FileTooLarge));
    assert_eq!(fs.inode(f).unwrap().size as usize, max);

    let root = fs.root().unwrap();
    let mut buf = [0u8; 4];
    assert_eq!(fs.read(root, 0, &mut buf), Err(Error::IsDirectory));
    assert_eq!(fs.write(root, 0, b"no"), Err(Error::IsDirectory));
}

#[test]
fn test_inode_type_mismatch_is_corrupted() {
    let disk = RamDisk::default_disk();
    let mut fs = FileSystem::mount(disk.clone(), Geometry::default()).unwrap();
    let file = fs.mknod("/f", FileType::Regular).unwrap();
    let ino = fs.dentry(file).unwrap().ino;
    let slot = fs.superblock().unwrap().ino_offset(ino);
    fs.unmount().unwrap();

    // The ftype field is the fourth u32 of the inode record.
    disk.patch(slot + 12, &(FileType::Directory as u32).to_le_bytes());
    let mut fs = FileSystem::mount(disk, Geometry::default()).unwrap();
    assert_eq!(fs.lookup("/f").err(), Some(Error::Corrupted));
    // The directory entry itself still lists the file.
    assert_eq!(entries(&mut fs, "/"), vec![("f".to_string(), FileType::Regular, ino)]);
}

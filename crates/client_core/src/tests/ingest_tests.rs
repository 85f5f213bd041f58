use super::*;

use std::{
    env, fs,
    time::{SystemTime, UNIX_EPOCH},
};

fn png(name: &str) -> ImageFile {
    ImageFile::new(name, "image/png", name.as_bytes().to_vec())
}

fn clip(item_type: &str, file: Option<ImageFile>) -> ClipboardItem {
    ClipboardItem {
        item_type: item_type.to_string(),
        file,
    }
}

fn names(files: &[ImageFile]) -> Vec<&str> {
    files.iter().map(|file| file.name.as_str()).collect()
}

#[test]
fn paste_keeps_image_items_in_clipboard_order() {
    let mut event = IngestEvent::paste(vec![
        clip("image/png", Some(png("b.png"))),
        clip("text/plain", None),
        clip("image/jpeg", Some(ImageFile::new("a.jpg", "image/jpeg", vec![1]))),
        clip("image/png", Some(png("c.png"))),
    ]);

    let files = normalize(&mut event, false);
    assert_eq!(names(&files), ["b.png", "a.jpg", "c.png"]);
    assert!(!event.is_default_prevented());
}

#[test]
fn paste_skips_image_items_without_file_payload() {
    let mut event = IngestEvent::paste(vec![clip("image/png", None), clip("image/png", Some(png("x.png")))]);
    assert_eq!(names(&normalize(&mut event, false)), ["x.png"]);
}

#[test]
fn paste_without_images_yields_nothing() {
    let mut event = IngestEvent::paste(vec![clip("text/html", None), clip("text/plain", None)]);
    assert!(normalize(&mut event, false).is_empty());
}

#[test]
fn disabled_paste_yields_nothing() {
    let mut event = IngestEvent::paste(vec![clip("image/png", Some(png("a.png")))]);
    assert!(normalize(&mut event, true).is_empty());
    assert!(!event.is_default_prevented());
}

#[test]
fn drop_filters_non_images_and_keeps_order() {
    let mut event = IngestEvent::drop_files(vec![
        png("3.png"),
        ImageFile::new("notes.txt", "text/plain", vec![]),
        ImageFile::new("1.webp", "IMAGE/WEBP", vec![]),
    ]);

    let files = normalize(&mut event, false);
    assert_eq!(names(&files), ["3.png", "1.webp"]);
    assert!(event.is_default_prevented());
}

#[test]
fn disabled_drop_still_suppresses_default_handling() {
    let mut event = IngestEvent::drop_files(vec![png("a.png")]);
    assert!(normalize(&mut event, true).is_empty());
    assert!(event.is_default_prevented());
}

#[test]
fn drag_over_is_suppressed_and_never_yields_files() {
    let mut event = IngestEvent::Drag(DragEvent::over());
    assert!(normalize(&mut event, false).is_empty());
    assert!(event.is_default_prevented());
}

#[test]
fn short_content_types_are_not_images() {
    assert!(!ImageFile::new("x", "img", vec![]).is_image());
    assert!(!ImageFile::new("x", "", vec![]).is_image());
}

#[tokio::test]
async fn from_path_guesses_content_type_from_extension() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let dir = env::temp_dir().join(format!("screenshots_ingest_{suffix}"));
    fs::create_dir_all(&dir).expect("temp dir");
    let path = dir.join("capture.png");
    fs::write(&path, b"\x89PNG").expect("write");

    let file = ImageFile::from_path(&path).await.expect("read file");
    assert_eq!(file.name, "capture.png");
    assert_eq!(file.content_type, "image/png");
    assert_eq!(file.bytes, b"\x89PNG");

    fs::remove_dir_all(dir).expect("cleanup");
}

#[tokio::test]
async fn from_path_reports_missing_files() {
    let err = ImageFile::from_path(Path::new("/definitely/not/here.png"))
        .await
        .expect_err("missing file");
    assert!(err.to_string().contains("failed to read"));
}

use super::*;
use crate::color::rgba::Color;
use crate::raster::buffer::ColorImage;

fn frame() -> PixelBuffer {
    PixelBuffer::Rgba(ColorImage::filled(1, 1, Color::WHITE))
}

#[test]
fn in_memory_sink_keeps_push_order() {
    let mut sink = InMemorySink::new();
    sink.push_frame("b.png", frame()).unwrap();
    sink.push_frame("a.png", frame()).unwrap();
    assert_eq!(sink.names(), vec!["b.png", "a.png"]);
    assert!(sink.frame("a.png").is_some());
    assert!(sink.frame("c.png").is_none());
    assert_eq!(sink.finish().unwrap().saved, 2);
}

#[test]
fn dir_sink_writes_under_its_directory() {
    let dir = Path::new("target/unit-encode/dir-sink");
    let mut sink = DirSink::new(dir, 1).unwrap();
    assert_eq!(sink.dir(), dir);
    sink.push_frame("one.png", frame()).unwrap();
    sink.push_frame("two.png", frame()).unwrap();
    let report = sink.finish().unwrap();
    assert_eq!(report, SaveReport { saved: 2, failed: 0 });
    assert!(dir.join("one.png").is_file());
    assert!(dir.join("two.png").is_file());

    assert!(sink.push_frame("late.png", frame()).is_err());
    assert_eq!(sink.finish().unwrap(), SaveReport::default());
}

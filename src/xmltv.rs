// src/xmltv.rs
//! XMLTV document tree. Sources append channels and programmes to one shared
//! `Tv`; serialisation writes every channel before any programme.

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::Result;
use crate::programme::{Channel, Programme, xmltv_time};

/// Every title and description is tagged with the guide's one language.
pub const LANG: &str = "fa";

/// A programme bound to the channel it airs on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    pub channel: String,
    pub programme: Programme,
}

#[derive(Clone, Debug)]
pub struct Tv {
    generator_name: String,
    generator_url: String,
    channels: Vec<Channel>,
    entries: Vec<Entry>,
}

impl Tv {
    pub fn new(generator_name: &str, generator_url: &str) -> Self {
        Self {
            generator_name: generator_name.to_string(),
            generator_url: generator_url.to_string(),
            channels: Vec::new(),
            entries: Vec::new(),
        }
    }

    pub fn add_channel(&mut self, channel: Channel) {
        self.channels.push(channel);
    }

    /// Appends programmes for `channel` in the given order and returns how
    /// many were added.
    pub fn add_programmes<I>(&mut self, channel: &str, programmes: I) -> usize
    where
        I: IntoIterator<Item = Programme>,
    {
        let before = self.entries.len();
        self.entries.extend(programmes.into_iter().map(|programme| Entry {
            channel: channel.to_string(),
            programme,
        }));
        self.entries.len() - before
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn programme_count(&self) -> usize {
        self.entries.len()
    }

    pub fn write_xml<W: Write>(&self, out: W) -> Result<()> {
        let mut w = Writer::new_with_indent(out, b' ', 2);
        w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        let mut root = BytesStart::new("tv");
        root.push_attribute(("generator-info-name", self.generator_name.as_str()));
        root.push_attribute(("generator-info-url", self.generator_url.as_str()));
        w.write_event(Event::Start(root))?;

        for ch in &self.channels {
            write_channel(&mut w, ch)?;
        }
        for entry in &self.entries {
            write_programme(&mut w, entry)?;
        }

        w.write_event(Event::End(BytesEnd::new("tv")))?;
        w.get_mut().write_all(b"\n")?;
        Ok(())
    }

    #[cfg(test)]
    pub fn to_xml_string(&self) -> Result<String> {
        let mut buf = Vec::new();
        self.write_xml(&mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        self.write_xml(&mut out)?;
        out.flush()?;
        Ok(())
    }
}

fn write_channel<W: Write>(w: &mut Writer<W>, ch: &Channel) -> Result<()> {
    let mut start = BytesStart::new("channel");
    start.push_attribute(("id", ch.id.as_str()));
    w.write_event(Event::Start(start))?;

    w.create_element("display-name")
        .write_text_content(BytesText::new(&ch.display_name))?;
    if let Some(logo) = &ch.logo {
        w.create_element("icon")
            .with_attribute(("src", logo.as_str()))
            .write_empty()?;
    }

    w.write_event(Event::End(BytesEnd::new("channel")))?;
    Ok(())
}

fn write_programme<W: Write>(w: &mut Writer<W>, entry: &Entry) -> Result<()> {
    let p = &entry.programme;

    let mut start = BytesStart::new("programme");
    start.push_attribute(("start", xmltv_time(&p.start).as_str()));
    if let Some(stop) = &p.stop {
        start.push_attribute(("stop", xmltv_time(stop).as_str()));
    }
    start.push_attribute(("channel", entry.channel.as_str()));
    w.write_event(Event::Start(start))?;

    w.create_element("title")
        .with_attribute(("lang", LANG))
        .write_text_content(BytesText::new(&p.title))?;
    if !p.description.is_empty() {
        w.create_element("desc")
            .with_attribute(("lang", LANG))
            .write_text_content(BytesText::new(&p.description))?;
    }
    if !p.image.is_empty() {
        w.create_element("icon")
            .with_attribute(("src", p.image.as_str()))
            .write_empty()?;
    }

    w.write_event(Event::End(BytesEnd::new("programme")))?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::programme::iran_tz;
    use chrono::{Duration, TimeZone};
    use quick_xml::Reader;
    use quick_xml::escape::unescape;
    use std::collections::HashMap;

    /// What a `<programme>` element carries once read back from XML.
    #[derive(Debug, Default, Clone, PartialEq, Eq)]
    pub(crate) struct ReadBack {
        pub attrs: HashMap<String, String>,
        pub title: Option<String>,
        pub title_lang: Option<String>,
        pub desc: Option<String>,
        pub desc_lang: Option<String>,
        pub icon: Option<String>,
    }

    fn attrs_of(e: &BytesStart) -> HashMap<String, String> {
        e.attributes()
            .flatten()
            .map(|a| {
                (
                    String::from_utf8_lossy(a.key.as_ref()).into_owned(),
                    unescape(&String::from_utf8_lossy(a.value.as_ref()))
                        .expect("well-formed attribute")
                        .into_owned(),
                )
            })
            .collect()
    }

    fn push_text(current: &mut Option<ReadBack>, field: Option<&str>, text: &str) {
        if let Some(p) = current.as_mut() {
            match field {
                Some("title") => p.title.get_or_insert_with(String::new).push_str(text),
                Some("desc") => p.desc.get_or_insert_with(String::new).push_str(text),
                _ => {}
            }
        }
    }

    /// Minimal reader for the programmes of a serialised guide. Text and
    /// attribute values come back unescaped, whitespace untouched.
    pub(crate) fn read_programmes(xml: &str) -> Vec<ReadBack> {
        let mut reader = Reader::from_str(xml);

        let mut out = Vec::new();
        let mut current: Option<ReadBack> = None;
        let mut field: Option<&'static str> = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                    b"programme" => {
                        current = Some(ReadBack { attrs: attrs_of(e), ..Default::default() });
                    }
                    b"title" => {
                        field = Some("title");
                        if let Some(p) = current.as_mut() {
                            p.title = Some(String::new());
                            p.title_lang = attrs_of(e).remove("lang");
                        }
                    }
                    b"desc" => {
                        field = Some("desc");
                        if let Some(p) = current.as_mut() {
                            p.desc = Some(String::new());
                            p.desc_lang = attrs_of(e).remove("lang");
                        }
                    }
                    b"icon" => {
                        if let Some(p) = current.as_mut() {
                            p.icon = attrs_of(e).remove("src");
                        }
                    }
                    _ => {}
                },
                Ok(Event::Text(e)) => {
                    let raw = String::from_utf8_lossy(e.as_ref()).into_owned();
                    let text = unescape(&raw).expect("well-formed text");
                    push_text(&mut current, field, &text);
                }
                // `&amp;` and friends arrive as separate events
                Ok(Event::GeneralRef(e)) => {
                    let entity = format!("&{};", String::from_utf8_lossy(&e));
                    let text = unescape(&entity).expect("known entity");
                    push_text(&mut current, field, &text);
                }
                Ok(Event::End(ref e)) => match e.name().as_ref() {
                    b"programme" => {
                        if let Some(p) = current.take() {
                            out.push(p);
                        }
                    }
                    b"title" | b"desc" => field = None,
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => panic!("malformed xml: {e}"),
                _ => {}
            }
        }
        out
    }

    fn sample(title: &str, minutes: i64, stop: Option<i64>) -> Programme {
        let base = iran_tz().with_ymd_and_hms(2026, 2, 19, 0, 0, 0).unwrap();
        Programme {
            start: base + Duration::minutes(minutes),
            stop: stop.map(|m| base + Duration::minutes(m)),
            title: title.to_string(),
            description: String::new(),
            image: String::new(),
        }
    }

    #[test]
    fn empty_guide_has_root_with_generator_info() {
        let tv = Tv::new("EPG-IRIB", "https://example.org/epg");
        let xml = tv.to_xml_string().unwrap();
        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(xml.contains(r#"generator-info-name="EPG-IRIB""#));
        assert!(xml.contains(r#"generator-info-url="https://example.org/epg""#));
        assert!(read_programmes(&xml).is_empty());
    }

    #[test]
    fn channels_are_written_before_programmes() {
        let mut tv = Tv::new("g", "u");
        tv.add_channel(Channel::new("A", "Channel A", "https://img/a.png"));
        tv.add_programmes("A", vec![sample("first", 0, Some(30))]);
        tv.add_channel(Channel::new("B", "Channel B", ""));
        tv.add_programmes("B", vec![sample("second", 0, None)]);

        let xml = tv.to_xml_string().unwrap();
        let last_channel = xml.rfind("<channel ").unwrap();
        let first_programme = xml.find("<programme ").unwrap();
        assert!(last_channel < first_programme);
        assert!(xml.contains("<display-name>Channel A</display-name>"));
        assert!(xml.contains(r#"<icon src="https://img/a.png"/>"#));
        assert_eq!(xml.matches("<icon").count(), 1);
    }

    #[test]
    fn add_programmes_is_additive() {
        let mut tv = Tv::new("g", "u");
        assert_eq!(tv.add_programmes("A", vec![sample("a", 0, None), sample("b", 5, None)]), 2);
        assert_eq!(tv.add_programmes("B", vec![sample("c", 0, None)]), 1);
        assert_eq!(tv.add_programmes("B", Vec::new()), 0);
        assert_eq!(tv.programme_count(), 3);
        assert_eq!(tv.entries()[2].channel, "B");
    }

    #[test]
    fn optional_children_follow_content() {
        let mut tv = Tv::new("g", "u");
        let mut full = sample("با توضیح", 0, Some(10));
        full.description = "خط اول\nخط دوم".into();
        full.image = "https://radio.ir/x.jpg".into();
        tv.add_programmes("R", vec![full, sample("bare", 10, None)]);

        let read = read_programmes(&tv.to_xml_string().unwrap());
        assert_eq!(read.len(), 2);

        assert_eq!(read[0].attrs["start"], "20260219000000 +0330");
        assert_eq!(read[0].attrs["stop"], "20260219001000 +0330");
        assert_eq!(read[0].attrs["channel"], "R");
        assert_eq!(read[0].title.as_deref(), Some("با توضیح"));
        assert_eq!(read[0].title_lang.as_deref(), Some("fa"));
        assert_eq!(read[0].desc.as_deref(), Some("خط اول\nخط دوم"));
        assert_eq!(read[0].desc_lang.as_deref(), Some("fa"));
        assert_eq!(read[0].icon.as_deref(), Some("https://radio.ir/x.jpg"));

        assert!(!read[1].attrs.contains_key("stop"));
        assert_eq!(read[1].desc, None);
        assert_eq!(read[1].icon, None);
    }

    #[test]
    fn markup_in_text_is_escaped() {
        let mut tv = Tv::new("g", "u");
        let mut p = sample("Tom & Jerry <live>", 0, None);
        p.image = "https://img?a=1&b=2".into();
        tv.add_programmes("C", vec![p]);

        let xml = tv.to_xml_string().unwrap();
        assert!(xml.contains("Tom &amp; Jerry &lt;live&gt;"));
        assert!(xml.contains("a=1&amp;b=2"));
    }

    #[test]
    fn escaped_content_round_trips() {
        let mut tv = Tv::new("g", "u");
        let mut p = sample("Tom & Jerry", 0, Some(30));
        p.description = "a < b\nو \"c\" > 'd'".into();
        p.image = "https://x?a=1&b=2".into();
        tv.add_programmes("C&D", vec![p.clone()]);

        let read = read_programmes(&tv.to_xml_string().unwrap());
        assert_eq!(read.len(), 1);
        assert_eq!(read[0].title.as_deref(), Some("Tom & Jerry"));
        assert_eq!(read[0].desc.as_deref(), Some(p.description.as_str()));
        assert_eq!(read[0].icon.as_deref(), Some("https://x?a=1&b=2"));
        assert_eq!(read[0].attrs["channel"], "C&D");
        assert_eq!(read[0].attrs["start"], xmltv_time(&p.start));
        assert_eq!(read[0].attrs["stop"], xmltv_time(&p.stop.unwrap()));
    }

    #[test]
    fn io_failure_surfaces_as_io_error() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("disk full"))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let tv = Tv::new("g", "u");
        assert!(matches!(tv.write_xml(Broken), Err(crate::error::Error::Io(_))));
    }

    #[test]
    fn writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("epg.xml");

        let mut tv = Tv::new("g", "u");
        tv.add_channel(Channel::new("A", "A", ""));
        tv.add_programmes("A", vec![sample("x", 0, Some(5))]);
        tv.write_to(&path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, tv.to_xml_string().unwrap());
        assert_eq!(read_programmes(&written).len(), 1);
    }
}

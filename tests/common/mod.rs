#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Cursor;

use image::{ImageFormat, Rgb, RgbImage};
use iiif_trainset::fetch::Transport;
use iiif_trainset::TrainsetError;

pub const MANIFEST_URL: &str = "https://iiif.example.org/books/b1/manifest.json";
pub const LIST_URL: &str = "https://annotations.example.org/lists/b1.json";

/// Serves canned responses and records every request.
#[derive(Default)]
pub struct MapTransport {
    responses: HashMap<String, Vec<u8>>,
    requests: RefCell<Vec<String>>,
}

impl MapTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        self.responses.insert(url.into(), body.into());
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }

    pub fn request_count(&self, url: &str) -> usize {
        self.requests.borrow().iter().filter(|u| *u == url).count()
    }
}

impl Transport for MapTransport {
    fn get(&self, url: &str) -> Result<Vec<u8>, TrainsetError> {
        self.requests.borrow_mut().push(url.to_string());
        self.responses
            .get(url)
            .cloned()
            .ok_or_else(|| TrainsetError::Fetch {
                url: url.to_string(),
                message: "HTTP status 404".to_string(),
            })
    }
}

pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, Rgb([200, 180, 150]));
    let mut bytes = Cursor::new(Vec::new());
    image
        .write_to(&mut bytes, ImageFormat::Jpeg)
        .expect("encode jpeg");
    bytes.into_inner()
}

pub fn image_service(page: &str) -> String {
    format!("https://img.example.org/iiif/{page}")
}

pub fn full_image_url(page: &str) -> String {
    format!("{}/full/full/0/default.jpg", image_service(page))
}

pub fn resized_image_url(page: &str) -> String {
    format!("{}/full/!1000,1000/0/default.jpg", image_service(page))
}

pub fn canvas_id(page: &str) -> String {
    format!("https://iiif.example.org/books/b1/canvas/{page}.tif.json")
}

/// A Presentation 2 manifest with one image per page, all `width` x `height`.
pub fn manifest_json(label: &str, pages: &[&str], width: u32, height: u32) -> String {
    manifest_json_with(label, pages, |page| {
        serde_json::json!({
            "@id": full_image_url(page),
            "@type": "dctypes:Image",
            "width": width,
            "height": height,
            "service": { "@id": image_service(page) }
        })
    })
}

/// A Presentation 2 manifest whose image resources are built by `resource`.
pub fn manifest_json_with(
    label: &str,
    pages: &[&str],
    resource: impl Fn(&str) -> serde_json::Value,
) -> String {
    let canvases: Vec<serde_json::Value> = pages
        .iter()
        .map(|page| {
            serde_json::json!({
                "@id": canvas_id(page),
                "@type": "sc:Canvas",
                "images": [{
                    "@type": "oa:Annotation",
                    "resource": resource(page)
                }]
            })
        })
        .collect();

    serde_json::json!({
        "@id": MANIFEST_URL,
        "@type": "sc:Manifest",
        "label": label,
        "sequences": [{ "canvases": canvases }]
    })
    .to_string()
}

pub fn info_url(page: &str) -> String {
    format!("{}/info.json", image_service(page))
}

pub fn info_json(width: u32, height: u32) -> String {
    serde_json::json!({
        "@context": "http://iiif.io/api/image/2/context.json",
        "width": width,
        "height": height
    })
    .to_string()
}

/// One tagged region annotation on `page`.
pub fn annotation_json(id: &str, manifest: &str, page: &str, xywh: &str, tags: &[&str]) -> serde_json::Value {
    let bodies: Vec<serde_json::Value> = tags
        .iter()
        .map(|tag| serde_json::json!({ "@type": "oa:Tag", "chars": tag }))
        .collect();

    serde_json::json!({
        "@id": id,
        "@type": "oa:Annotation",
        "motivation": ["oa:tagging"],
        "resource": bodies,
        "on": [{
            "@type": "oa:SpecificResource",
            "full": canvas_id(page),
            "selector": {
                "@type": "oa:Choice",
                "default": { "@type": "oa:FragmentSelector", "value": format!("xywh={xywh}") },
                "item": { "@type": "oa:SvgSelector", "value": "<svg/>" }
            },
            "within": { "@id": manifest, "@type": "sc:Manifest" }
        }]
    })
}

pub fn annotation_list_json(resources: Vec<serde_json::Value>) -> String {
    serde_json::json!({
        "@id": LIST_URL,
        "@type": "sc:AnnotationList",
        "resources": resources
    })
    .to_string()
}

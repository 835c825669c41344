//! PowerPoint (.pptx) writer
//!
//! Produces the smallest package PowerPoint and LibreOffice will open: one
//! blank master and layout, a theme, and one slide per image with the image
//! scaled to fit and centred.

use crate::archive::bundle;
use crate::error::PdfDeskError;

const EMU_PER_INCH: u64 = 914_400;
/// Slides are 10 inches wide; height follows the first image's aspect ratio.
const SLIDE_WIDTH_EMU: u64 = 10 * EMU_PER_INCH;
const MIN_SLIDE_EMU: u64 = EMU_PER_INCH;
const MAX_SLIDE_EMU: u64 = 56 * EMU_PER_INCH;

const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_P: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";
const NS_PKG_REL: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const REL_TYPE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

/// One rendered page, PNG encoded.
#[derive(Debug, Clone)]
pub struct SlideImage {
    pub png: Vec<u8>,
    pub width_px: u32,
    pub height_px: u32,
}

/// Build a presentation with one full-slide picture per image.
pub fn build_slide_deck(slides: &[SlideImage]) -> Result<Vec<u8>, PdfDeskError> {
    let first = slides
        .first()
        .ok_or_else(|| PdfDeskError::OperationError("No slides to write".into()))?;
    let slide_size = slide_size(first);

    let mut entries: Vec<(String, Vec<u8>)> = vec![
        ("[Content_Types].xml".into(), content_types(slides.len()).into_bytes()),
        ("_rels/.rels".into(), package_rels().into_bytes()),
        ("ppt/presentation.xml".into(), presentation(slides.len(), slide_size).into_bytes()),
        (
            "ppt/_rels/presentation.xml.rels".into(),
            presentation_rels(slides.len()).into_bytes(),
        ),
        ("ppt/slideMasters/slideMaster1.xml".into(), slide_master().into_bytes()),
        (
            "ppt/slideMasters/_rels/slideMaster1.xml.rels".into(),
            relationships(&[
                ("rId1", "slideLayout", "../slideLayouts/slideLayout1.xml"),
                ("rId2", "theme", "../theme/theme1.xml"),
            ])
            .into_bytes(),
        ),
        ("ppt/slideLayouts/slideLayout1.xml".into(), slide_layout().into_bytes()),
        (
            "ppt/slideLayouts/_rels/slideLayout1.xml.rels".into(),
            relationships(&[("rId1", "slideMaster", "../slideMasters/slideMaster1.xml")]).into_bytes(),
        ),
        ("ppt/theme/theme1.xml".into(), THEME.to_string().into_bytes()),
    ];

    for (i, slide) in slides.iter().enumerate() {
        let n = i + 1;
        let media = format!("../media/image{}.png", n);
        entries.push((format!("ppt/slides/slide{}.xml", n), slide_xml(n, slide, slide_size).into_bytes()));
        entries.push((
            format!("ppt/slides/_rels/slide{}.xml.rels", n),
            relationships(&[
                ("rId1", "slideLayout", "../slideLayouts/slideLayout1.xml"),
                ("rId2", "image", media.as_str()),
            ])
            .into_bytes(),
        ));
        entries.push((format!("ppt/media/image{}.png", n), slide.png.clone()));
    }

    bundle(entries)
}

fn slide_size(first: &SlideImage) -> (u64, u64) {
    let width = u64::from(first.width_px.max(1));
    let height = u64::from(first.height_px.max(1));
    let cy = (SLIDE_WIDTH_EMU * height / width).clamp(MIN_SLIDE_EMU, MAX_SLIDE_EMU);
    (SLIDE_WIDTH_EMU, cy)
}

/// Offset and extent of `image` scaled to fit inside the slide, centred.
fn fit(image: &SlideImage, (cx, cy): (u64, u64)) -> (u64, u64, u64, u64) {
    let width = u64::from(image.width_px.max(1));
    let height = u64::from(image.height_px.max(1));
    let (w, h) = if width * cy > height * cx {
        (cx, cx * height / width)
    } else {
        (cy * width / height, cy)
    };
    ((cx - w) / 2, (cy - h) / 2, w, h)
}

fn content_types(slide_count: usize) -> String {
    const PML: &str = "application/vnd.openxmlformats-officedocument.presentationml";
    let slides: String = (1..=slide_count)
        .map(|n| {
            format!(
                r#"<Override PartName="/ppt/slides/slide{}.xml" ContentType="{}.slide+xml"/>"#,
                n, PML
            )
        })
        .collect();
    format!(
        concat!(
            "{decl}<Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">",
            "<Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>",
            "<Default Extension=\"xml\" ContentType=\"application/xml\"/>",
            "<Default Extension=\"png\" ContentType=\"image/png\"/>",
            "<Override PartName=\"/ppt/presentation.xml\" ContentType=\"{pml}.presentation.main+xml\"/>",
            "<Override PartName=\"/ppt/slideMasters/slideMaster1.xml\" ContentType=\"{pml}.slideMaster+xml\"/>",
            "<Override PartName=\"/ppt/slideLayouts/slideLayout1.xml\" ContentType=\"{pml}.slideLayout+xml\"/>",
            "<Override PartName=\"/ppt/theme/theme1.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.theme+xml\"/>",
            "{slides}</Types>"
        ),
        decl = XML_DECL,
        pml = PML,
        slides = slides
    )
}

fn package_rels() -> String {
    format!(
        r#"{}<Relationships xmlns="{}"><Relationship Id="rId1" Type="{}/officeDocument" Target="ppt/presentation.xml"/></Relationships>"#,
        XML_DECL, NS_PKG_REL, REL_TYPE
    )
}

fn relationships(rels: &[(&str, &str, &str)]) -> String {
    let body: String = rels
        .iter()
        .map(|(id, kind, target)| {
            format!(
                r#"<Relationship Id="{}" Type="{}/{}" Target="{}"/>"#,
                id, REL_TYPE, kind, target
            )
        })
        .collect();
    format!(r#"{}<Relationships xmlns="{}">{}</Relationships>"#, XML_DECL, NS_PKG_REL, body)
}

fn presentation(slide_count: usize, (cx, cy): (u64, u64)) -> String {
    // rId1 is the master; slides follow.
    let ids: String = (1..=slide_count)
        .map(|n| format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 255 + n, n + 1))
        .collect();
    format!(
        concat!(
            "{decl}<p:presentation xmlns:a=\"{a}\" xmlns:r=\"{r}\" xmlns:p=\"{p}\">",
            "<p:sldMasterIdLst><p:sldMasterId id=\"2147483648\" r:id=\"rId1\"/></p:sldMasterIdLst>",
            "<p:sldIdLst>{ids}</p:sldIdLst>",
            "<p:sldSz cx=\"{cx}\" cy=\"{cy}\"/><p:notesSz cx=\"6858000\" cy=\"9144000\"/>",
            "</p:presentation>"
        ),
        decl = XML_DECL,
        a = NS_A,
        r = NS_R,
        p = NS_P,
        ids = ids,
        cx = cx,
        cy = cy
    )
}

fn presentation_rels(slide_count: usize) -> String {
    let slide_targets: Vec<(String, String)> = (1..=slide_count)
        .map(|n| (format!("rId{}", n + 1), format!("slides/slide{}.xml", n)))
        .collect();
    let theme_id = format!("rId{}", slide_count + 2);

    let mut rels = vec![("rId1", "slideMaster", "slideMasters/slideMaster1.xml")];
    rels.extend(
        slide_targets
            .iter()
            .map(|(id, target)| (id.as_str(), "slide", target.as_str())),
    );
    rels.push((theme_id.as_str(), "theme", "theme/theme1.xml"));
    relationships(&rels)
}

const EMPTY_GROUP: &str = concat!(
    "<p:nvGrpSpPr><p:cNvPr id=\"1\" name=\"\"/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>",
    "<p:grpSpPr><a:xfrm><a:off x=\"0\" y=\"0\"/><a:ext cx=\"0\" cy=\"0\"/>",
    "<a:chOff x=\"0\" y=\"0\"/><a:chExt cx=\"0\" cy=\"0\"/></a:xfrm></p:grpSpPr>"
);

fn slide_master() -> String {
    format!(
        concat!(
            "{decl}<p:sldMaster xmlns:a=\"{a}\" xmlns:r=\"{r}\" xmlns:p=\"{p}\">",
            "<p:cSld><p:bg><p:bgRef idx=\"1001\"><a:schemeClr val=\"bg1\"/></p:bgRef></p:bg>",
            "<p:spTree>{group}</p:spTree></p:cSld>",
            "<p:clrMap bg1=\"lt1\" tx1=\"dk1\" bg2=\"lt2\" tx2=\"dk2\" accent1=\"accent1\" accent2=\"accent2\" ",
            "accent3=\"accent3\" accent4=\"accent4\" accent5=\"accent5\" accent6=\"accent6\" hlink=\"hlink\" folHlink=\"folHlink\"/>",
            "<p:sldLayoutIdLst><p:sldLayoutId id=\"2147483649\" r:id=\"rId1\"/></p:sldLayoutIdLst>",
            "</p:sldMaster>"
        ),
        decl = XML_DECL,
        a = NS_A,
        r = NS_R,
        p = NS_P,
        group = EMPTY_GROUP
    )
}

fn slide_layout() -> String {
    format!(
        concat!(
            "{decl}<p:sldLayout xmlns:a=\"{a}\" xmlns:r=\"{r}\" xmlns:p=\"{p}\" type=\"blank\" preserve=\"1\">",
            "<p:cSld name=\"Blank\"><p:spTree>{group}</p:spTree></p:cSld>",
            "<p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>"
        ),
        decl = XML_DECL,
        a = NS_A,
        r = NS_R,
        p = NS_P,
        group = EMPTY_GROUP
    )
}

fn slide_xml(n: usize, image: &SlideImage, slide_size: (u64, u64)) -> String {
    let (x, y, cx, cy) = fit(image, slide_size);
    format!(
        concat!(
            "{decl}<p:sld xmlns:a=\"{a}\" xmlns:r=\"{r}\" xmlns:p=\"{p}\"><p:cSld><p:spTree>{group}",
            "<p:pic><p:nvPicPr><p:cNvPr id=\"2\" name=\"Page {n}\"/>",
            "<p:cNvPicPr><a:picLocks noChangeAspect=\"1\"/></p:cNvPicPr><p:nvPr/></p:nvPicPr>",
            "<p:blipFill><a:blip r:embed=\"rId2\"/><a:stretch><a:fillRect/></a:stretch></p:blipFill>",
            "<p:spPr><a:xfrm><a:off x=\"{x}\" y=\"{y}\"/><a:ext cx=\"{cx}\" cy=\"{cy}\"/></a:xfrm>",
            "<a:prstGeom prst=\"rect\"><a:avLst/></a:prstGeom></p:spPr></p:pic>",
            "</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"
        ),
        decl = XML_DECL,
        a = NS_A,
        r = NS_R,
        p = NS_P,
        group = EMPTY_GROUP,
        n = n,
        x = x,
        y = y,
        cx = cx,
        cy = cy
    )
}

const THEME: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Office Theme"><a:themeElements>"#,
    r#"<a:clrScheme name="Office">"#,
    r#"<a:dk1><a:sysClr val="windowText" lastClr="000000"/></a:dk1><a:lt1><a:sysClr val="window" lastClr="FFFFFF"/></a:lt1>"#,
    r#"<a:dk2><a:srgbClr val="44546A"/></a:dk2><a:lt2><a:srgbClr val="E7E6E6"/></a:lt2>"#,
    r#"<a:accent1><a:srgbClr val="4472C4"/></a:accent1><a:accent2><a:srgbClr val="ED7D31"/></a:accent2>"#,
    r#"<a:accent3><a:srgbClr val="A5A5A5"/></a:accent3><a:accent4><a:srgbClr val="FFC000"/></a:accent4>"#,
    r#"<a:accent5><a:srgbClr val="5B9BD5"/></a:accent5><a:accent6><a:srgbClr val="70AD47"/></a:accent6>"#,
    r#"<a:hlink><a:srgbClr val="0563C1"/></a:hlink><a:folHlink><a:srgbClr val="954F72"/></a:folHlink>"#,
    r#"</a:clrScheme>"#,
    r#"<a:fontScheme name="Office"><a:majorFont><a:latin typeface="Calibri Light"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont>"#,
    r#"<a:minorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont></a:fontScheme>"#,
    r#"<a:fmtScheme name="Office"><a:fillStyleLst>"#,
    r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#,
    r#"</a:fillStyleLst><a:lnStyleLst>"#,
    r#"<a:ln w="6350"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>"#,
    r#"<a:ln w="12700"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>"#,
    r#"<a:ln w="19050"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>"#,
    r#"</a:lnStyleLst><a:effectStyleLst>"#,
    r#"<a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle>"#,
    r#"</a:effectStyleLst><a:bgFillStyleLst>"#,
    r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#,
    r#"</a:bgFillStyleLst></a:fmtScheme></a:themeElements></a:theme>"#
);

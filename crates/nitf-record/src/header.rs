//! Layouts of the file header and the segment subheaders.
//!
//! Headers are described with the same descriptor tables as TREs: the
//! per-kind component-info pairs are a loop driven by the count field, and
//! the user-defined and extended data blocks are present only when their
//! length field is non-zero.

use crate::kind::SegmentKind;
use nitf_core::FieldKind::{Alphanumeric as A, Binary as B, Numeric as N};
use nitf_core::{Error, Result, OVERFLOW_FIELD_SIZE};
use nitf_tre::{CmpOp, Condition, Count, DescriptorTable, Extensions, Tre, TreCatalog};
use tracing::trace;

/// Tag given to the file header.
pub const FILE_HEADER_TAG: &str = "NITF";

/// Appends the 166 byte security group following a classification field.
fn security(table: DescriptorTable, prefix: &str) -> DescriptorTable {
    const GROUP: [(&str, &str, usize); 15] = [
        ("CLSY", "Classification System", 2),
        ("CODE", "Codewords", 11),
        ("CTLH", "Control and Handling", 2),
        ("REL", "Releasing Instructions", 20),
        ("DCTP", "Declassification Type", 2),
        ("DCDT", "Declassification Date", 8),
        ("DCXM", "Declassification Exemption", 4),
        ("DG", "Downgrade", 1),
        ("DGDT", "Downgrade Date", 8),
        ("CLTX", "Classification Text", 43),
        ("CATP", "Classification Authority Type", 1),
        ("CAUT", "Classification Authority", 40),
        ("CRSN", "Classification Reason", 1),
        ("SRDT", "Security Source Date", 8),
        ("CTLN", "Security Control Number", 15),
    ];
    GROUP.iter().fold(table, |t, (suffix, label, len)| {
        t.field(&format!("{prefix}{suffix}"), label, A, *len)
    })
}

/// Appends `LEN`, and when it is non-zero, `OFL` and `DATA` of `LEN - 3` bytes.
fn data_block(table: DescriptorTable, fields: (&str, &str, &str), label: &str) -> DescriptorTable {
    let (len, ofl, data) = fields;
    table.field(len, &format!("{label} Length"), N, 5).when(
        Condition::compare(len, CmpOp::Gt, 0.0),
        DescriptorTable::new()
            .field(ofl, &format!("{label} Overflow"), N, OVERFLOW_FIELD_SIZE)
            .computed(data, label, B, &format!("{len} {OVERFLOW_FIELD_SIZE} -")),
    )
}

/// File header layout.
pub fn file_header_table() -> DescriptorTable {
    let table = DescriptorTable::new()
        .field("FHDR", "File Profile Name", A, 4)
        .field("FVER", "File Version", A, 5)
        .field("CLEVEL", "Complexity Level", N, 2)
        .field("STYPE", "Standard Type", A, 4)
        .field("OSTAID", "Originating Station ID", A, 10)
        .field("FDT", "File Date and Time", N, 14)
        .field("FTITLE", "File Title", A, 80)
        .field("FSCLAS", "File Security Classification", A, 1);
    let mut table = security(table, "FS")
        .field("FSCOP", "File Copy Number", N, 5)
        .field("FSCPYS", "File Number of Copies", N, 5)
        .field("ENCRYP", "Encryption", N, 1)
        .field("FBKGC", "File Background Color", B, 3)
        .field("ONAME", "Originator Name", A, 24)
        .field("OPHONE", "Originator Phone Number", A, 18)
        .field("FL", "File Length", N, 12)
        .field("HL", "File Header Length", N, 6);

    for kind in SegmentKind::ALL {
        let (sub, data) = kind.info_fields();
        let widths = kind.info_widths();
        table = table
            .field(kind.count_field(), &format!("Number of {} Segments", kind), N, 3)
            .repeat(
                Count::field(kind.count_field()),
                DescriptorTable::new()
                    .field(sub, &format!("Length of {} Subheader", kind), N, widths.subheader)
                    .field(data, &format!("Length of {} Segment", kind), N, widths.data),
            );
    }

    let table = data_block(table, ("UDHDL", "UDHOFL", "UDHD"), "User Defined Header Data");
    data_block(table, ("XHDL", "XHDLOFL", "XHD"), "Extended Header Data")
}

/// Subheader layout of `kind`.
pub fn subheader_table(kind: SegmentKind) -> DescriptorTable {
    match kind {
        SegmentKind::Image => image_subheader(),
        SegmentKind::Graphic => graphic_subheader(),
        SegmentKind::Label => label_subheader(),
        SegmentKind::Text => text_subheader(),
        SegmentKind::DataExtension => des_subheader(),
        SegmentKind::ReservedExtension => res_subheader(),
    }
}

fn image_band() -> DescriptorTable {
    DescriptorTable::new()
        .field("IREPBAND", "Band Representation", A, 2)
        .field("ISUBCAT", "Band Subcategory", A, 6)
        .field("IFC", "Band Image Filter Condition", A, 1)
        .field("IMFLT", "Band Standard Image Filter Code", A, 3)
        .field("NLUTS", "Number of LUTs", N, 1)
        .when(
            Condition::compare("NLUTS", CmpOp::Gt, 0.0),
            DescriptorTable::new()
                .field("NELUT", "Number of LUT Entries", N, 5)
                .repeat(
                    Count::field("NLUTS"),
                    DescriptorTable::new().computed("LUTD", "LUT Data", B, "NELUT"),
                ),
        )
}

fn image_subheader() -> DescriptorTable {
    let table = DescriptorTable::new()
        .field("IM", "File Part Type", A, 2)
        .field("IID1", "Image Identifier 1", A, 10)
        .field("IDATIM", "Image Date and Time", N, 14)
        .field("TGTID", "Target Identifier", A, 17)
        .field("IID2", "Image Identifier 2", A, 80)
        .field("ISCLAS", "Image Security Classification", A, 1);
    let table = security(table, "IS")
        .field("ENCRYP", "Encryption", N, 1)
        .field("ISORCE", "Image Source", A, 42)
        .field("NROWS", "Number of Significant Rows", N, 8)
        .field("NCOLS", "Number of Significant Columns", N, 8)
        .field("PVTYPE", "Pixel Value Type", A, 3)
        .field("IREP", "Image Representation", A, 8)
        .field("ICAT", "Image Category", A, 8)
        .field("ABPP", "Actual Bits-Per-Pixel", N, 2)
        .field("PJUST", "Pixel Justification", A, 1)
        .field("ICORDS", "Image Coordinate Representation", A, 1)
        .when(
            Condition::text_ne("ICORDS", ""),
            DescriptorTable::new().field("IGEOLO", "Image Geographic Location", A, 60),
        )
        .field("NICOM", "Number of Image Comments", N, 1)
        .repeat(
            Count::field("NICOM"),
            DescriptorTable::new().field("ICOM", "Image Comment", A, 80),
        )
        .field("IC", "Image Compression", A, 2)
        .when(
            Condition::text_ne("IC", "NC"),
            DescriptorTable::new().when(
                Condition::text_ne("IC", "NM"),
                DescriptorTable::new().field("COMRAT", "Compression Rate Code", A, 4),
            ),
        )
        .field("NBANDS", "Number of Bands", N, 1)
        .repeat(Count::field("NBANDS"), image_band())
        .when(
            Condition::compare("NBANDS", CmpOp::Eq, 0.0),
            DescriptorTable::new()
                .field("XBANDS", "Number of Multispectral Bands", N, 5)
                .repeat(Count::field("XBANDS"), image_band()),
        )
        .field("ISYNC", "Image Sync Code", N, 1)
        .field("IMODE", "Image Mode", A, 1)
        .field("NBPR", "Number of Blocks Per Row", N, 4)
        .field("NBPC", "Number of Blocks Per Column", N, 4)
        .field("NPPBH", "Number of Pixels Per Block Horizontal", N, 4)
        .field("NPPBV", "Number of Pixels Per Block Vertical", N, 4)
        .field("NBPP", "Number of Bits Per Pixel", N, 2)
        .field("IDLVL", "Display Level", N, 3)
        .field("IALVL", "Attachment Level", N, 3)
        .field("ILOC", "Image Location", N, 10)
        .field("IMAG", "Image Magnification", A, 4);
    let table = data_block(table, ("UDIDL", "UDOFL", "UDID"), "User Defined Image Data");
    data_block(table, ("IXSHDL", "IXSOFL", "IXSHD"), "Image Extended Subheader Data")
}

fn graphic_subheader() -> DescriptorTable {
    let table = DescriptorTable::new()
        .field("SY", "File Part Type", A, 2)
        .field("SID", "Graphic Identifier", A, 10)
        .field("SNAME", "Graphic Name", A, 20)
        .field("SSCLAS", "Graphic Security Classification", A, 1);
    let table = security(table, "SS")
        .field("ENCRYP", "Encryption", N, 1)
        .field("SFMT", "Graphic Type", A, 1)
        .field("SSTRUCT", "Reserved", N, 13)
        .field("SDLVL", "Display Level", N, 3)
        .field("SALVL", "Attachment Level", N, 3)
        .field("SLOC", "Graphic Location", N, 10)
        .field("SBND1", "First Graphic Bound Location", N, 10)
        .field("SCOLOR", "Graphic Color", A, 1)
        .field("SBND2", "Second Graphic Bound Location", N, 10)
        .field("SRES2", "Reserved", N, 2);
    data_block(table, ("SXSHDL", "SXSOFL", "SXSHD"), "Graphic Extended Subheader Data")
}

fn label_subheader() -> DescriptorTable {
    let table = DescriptorTable::new()
        .field("LA", "File Part Type", A, 2)
        .field("LID", "Label Identifier", A, 10)
        .field("LSCLAS", "Label Security Classification", A, 1);
    let table = security(table, "LS")
        .field("ENCRYP", "Encryption", N, 1)
        .field("LFS", "Label Font Style", A, 1)
        .field("LCW", "Label Cell Width", N, 2)
        .field("LCH", "Label Cell Height", N, 2)
        .field("LDLVL", "Display Level", N, 3)
        .field("LALVL", "Attachment Level", N, 3)
        .field("LLOCR", "Label Location Row", N, 5)
        .field("LLOCC", "Label Location Column", N, 5)
        .field("LTC", "Label Text Color", B, 3)
        .field("LBC", "Label Background Color", B, 3);
    data_block(table, ("LXSHDL", "LXSOFL", "LXSHD"), "Label Extended Subheader Data")
}

fn text_subheader() -> DescriptorTable {
    let table = DescriptorTable::new()
        .field("TE", "File Part Type", A, 2)
        .field("TEXTID", "Text Identifier", A, 7)
        .field("TXTALVL", "Attachment Level", N, 3)
        .field("TXTDT", "Text Date and Time", N, 14)
        .field("TXTITL", "Text Title", A, 80)
        .field("TSCLAS", "Text Security Classification", A, 1);
    let table = security(table, "TS")
        .field("ENCRYP", "Encryption", N, 1)
        .field("TXTFMT", "Text Format", A, 3);
    data_block(table, ("TXSHDL", "TXSOFL", "TXSHD"), "Text Extended Subheader Data")
}

fn des_subheader() -> DescriptorTable {
    let table = DescriptorTable::new()
        .field("DE", "File Part Type", A, 2)
        .field("DESID", "Unique DES Type Identifier", A, 25)
        .field("DESVER", "Version of the Data Definition", N, 2)
        .field("DECLAS", "DES Security Classification", A, 1);
    security(table, "DES")
        .when(
            Condition::text_eq("DESID", "TRE_OVERFLOW"),
            DescriptorTable::new()
                .field("DESOFLW", "Overflowed Header Type", A, 6)
                .field("DESITEM", "Data Item Overflowed", N, 3),
        )
        .field("DESSHL", "Length of User-defined Subheader Fields", N, 4)
        .computed("DESSHF", "User-defined Subheader Fields", A, "DESSHL")
}

fn res_subheader() -> DescriptorTable {
    let table = DescriptorTable::new()
        .field("RE", "File Part Type", A, 2)
        .field("RESID", "Unique RES Type Identifier", A, 25)
        .field("RESVER", "Version of the Data Definition", N, 2)
        .field("RECLAS", "RES Security Classification", A, 1);
    security(table, "RES")
        .field("RESSHL", "Length of User-defined Subheader Fields", N, 4)
        .computed("RESSHF", "User-defined Subheader Fields", A, "RESSHL")
}

/// Creates a file header with the fixed identification fields filled in.
pub fn new_file_header() -> Result<Tre> {
    let mut header = Tre::new(FILE_HEADER_TAG, file_header_table())?;
    header.set_field("FHDR", nitf_core::FILE_PROFILE)?;
    header.set_field("FVER", nitf_core::FILE_VERSION)?;
    header.set_field("CLEVEL", &3u8)?;
    header.set_field("STYPE", "BF01")?;
    header.set_field("FSCLAS", "U")?;
    Ok(header)
}

/// Creates a default subheader for `kind`.
pub fn new_subheader(kind: SegmentKind) -> Result<Tre> {
    let mut sub = Tre::new(kind.marker(), subheader_table(kind))?;
    sub.set_field(kind.marker(), kind.marker())?;
    match kind {
        SegmentKind::Image => {
            sub.set_field("ISCLAS", "U")?;
            sub.set_field("PVTYPE", "INT")?;
            sub.set_field("IREP", "MONO")?;
            sub.set_field("ICAT", "VIS")?;
            sub.set_field("PJUST", "R")?;
            sub.set_field("IC", "NC")?;
            sub.set_field("NBANDS", &1u8)?;
            sub.set_field("IMODE", "B")?;
            sub.set_field("IMAG", "1.0")?;
        }
        SegmentKind::Graphic => {
            sub.set_field("SSCLAS", "U")?;
            sub.set_field("SFMT", "C")?;
        }
        SegmentKind::Label => sub.set_field("LSCLAS", "U")?,
        SegmentKind::Text => {
            sub.set_field("TSCLAS", "U")?;
            sub.set_field("TXTFMT", "STA")?;
        }
        SegmentKind::DataExtension => {
            sub.set_field("DECLAS", "U")?;
            sub.set_field("DESVER", &1u8)?;
        }
        SegmentKind::ReservedExtension => {
            sub.set_field("RECLAS", "U")?;
            sub.set_field("RESVER", &1u8)?;
        }
    }
    Ok(sub)
}

/// Writes `ext` into the `(length, overflow, data)` block of `tre`.
///
/// The overflow pointer is kept as it was. Fails with a range error if the
/// encoded block does not fit the five digit length field.
pub fn store_extensions(tre: &mut Tre, fields: (&str, &str, &str), ext: &Extensions) -> Result<()> {
    let (len, _ofl, data) = fields;
    let encoded = ext.encode()?;
    if encoded.is_empty() {
        return tre.set_field(len, &0u8);
    }
    let total = encoded.len() + OVERFLOW_FIELD_SIZE;
    if total > 99_999 {
        return Err(Error::range(format!(
            "{} bytes of extensions do not fit in {}",
            encoded.len(),
            len
        )));
    }
    tre.set_field(len, &total)?;
    tre.set_raw_field(data, &encoded)?;
    trace!(field = len, bytes = total, "stored extensions");
    Ok(())
}

/// Decodes the `(length, overflow, data)` block of `tre`.
pub fn load_extensions(
    tre: &Tre,
    fields: (&str, &str, &str),
    catalog: &TreCatalog,
    strict: bool,
) -> Result<Extensions> {
    let (len, _ofl, data) = fields;
    let length: usize = tre.get(len)?;
    if length == 0 {
        return Ok(Extensions::new());
    }
    if length < OVERFLOW_FIELD_SIZE {
        return Err(Error::parse(format!("{} of {} is shorter than its overflow field", len, length)));
    }
    if length == OVERFLOW_FIELD_SIZE {
        return Ok(Extensions::new());
    }
    Extensions::decode(tre.get_field(data)?.raw(), catalog, strict)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_header_default_size() {
        let header = new_file_header().unwrap();
        // 9 + 2 + 4 + 10 + 14 + 80 + 1 + 166 + 5 + 5 + 1 + 3 + 24 + 18 + 12 + 6
        // + 6 count fields + UDHDL + XHDL
        assert_eq!(header.current_size().unwrap(), 360 + 18 + 10);
        assert_eq!(header.get::<String>("FHDR").unwrap(), "NITF");
    }

    #[test]
    fn test_counts_drive_component_info() {
        let mut header = new_file_header().unwrap();
        let base = header.current_size().unwrap();
        header.set_field("NUMI", &2u8).unwrap();
        header.set_field("NUMT", &1u8).unwrap();
        assert_eq!(header.current_size().unwrap(), base + 2 * 16 + 9);
        assert!(header.get_field("LI[1]").is_ok());
        assert!(header.get_field("LT[1]").unwrap_err().is_schema());
    }

    #[test]
    fn test_image_subheader_conditionals() {
        let mut sub = new_subheader(SegmentKind::Image).unwrap();
        assert!(!sub.is_reachable("COMRAT").unwrap());
        assert!(!sub.is_reachable("IGEOLO").unwrap());
        sub.set_field("IC", "C3").unwrap();
        assert!(sub.is_reachable("COMRAT").unwrap());

        sub.set_field("NBANDS", &1u8).unwrap();
        sub.set_field("NLUTS[0]", &2u8).unwrap();
        sub.set_field("NELUT[0]", &4u8).unwrap();
        assert_eq!(sub.get_field("LUTD[0][1]").unwrap().len(), 4);

        sub.set_field("NBANDS", &0u8).unwrap();
        sub.set_field("XBANDS", &3u8).unwrap();
        assert!(sub.is_reachable("IREPBAND[2]").unwrap());
    }

    #[test]
    fn test_extensions_block_round_trip() {
        let catalog = TreCatalog::with_builtins();
        let mut sub = new_subheader(SegmentKind::Text).unwrap();
        let fields = SegmentKind::Text.extended_fields().unwrap();
        let mut ext = Extensions::new();
        ext.append(Tre::opaque("ABCDEF", b"xyz"));
        store_extensions(&mut sub, fields, &ext).unwrap();
        assert_eq!(sub.get::<u32>("TXSHDL").unwrap(), 17);
        let back = load_extensions(&sub, fields, &catalog, true).unwrap();
        assert_eq!(back, ext);

        store_extensions(&mut sub, fields, &Extensions::new()).unwrap();
        assert!(!sub.is_reachable("TXSHD").unwrap());
    }

    #[test]
    fn test_des_overflow_fields() {
        let mut des = new_subheader(SegmentKind::DataExtension).unwrap();
        assert!(!des.is_reachable("DESOFLW").unwrap());
        des.set_field("DESID", "TRE_OVERFLOW").unwrap();
        assert!(des.is_reachable("DESITEM").unwrap());
    }
}

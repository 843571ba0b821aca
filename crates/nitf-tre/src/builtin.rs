//! Built-in TRE layouts.
//!
//! These cover each feature of the descriptor language: count-driven loops
//! with computed widths (ENGRDA), nested loops with text conditions (ACCHZB),
//! a remainder-width body (JITCID) and bit-mask conditions (BANDSB).

use crate::descriptor::DescriptorTable;
use crate::expr::{Condition, Count};
use nitf_core::FieldKind::{Alphanumeric as A, Binary as B, Numeric as N};

/// All built-in `(tag, table)` pairs.
pub fn tables() -> Vec<(&'static str, DescriptorTable)> {
    vec![
        ("ENGRDA", engrda()),
        ("ACCHZB", acchzb()),
        ("JITCID", jitcid()),
        ("BANDSB", bandsb()),
    ]
}

/// Engineering data.
pub fn engrda() -> DescriptorTable {
    DescriptorTable::new()
        .field("RESRC", "Unique Source System Name", A, 20)
        .field("RECNT", "Record Entry Count", N, 3)
        .repeat(
            Count::field("RECNT"),
            DescriptorTable::new()
                .field("ENGLN", "Engineering Data Label Length", N, 2)
                .computed("ENGLBL", "Engineering Data Label", A, "ENGLN")
                .field("ENGMTXC", "Engineering Matrix Data Column Count", N, 4)
                .field("ENGMTXR", "Engineering Matrix Data Row Count", N, 4)
                .field("ENGTYP", "Value Type of Engineering Data Element", A, 1)
                .field("ENGDTS", "Engineering Data Element Size", N, 1)
                .field("ENGDATU", "Engineering Data Units", A, 2)
                .field("ENGDATC", "Engineering Data Count", N, 8)
                .computed("ENGDATA", "Engineering Data", B, "ENGDATC ENGDTS *"),
        )
}

/// Horizontal accuracy.
pub fn acchzb() -> DescriptorTable {
    DescriptorTable::new()
        .field("NUMACHZ", "Number of Horizontal Accuracy Regions", N, 2)
        .repeat(
            Count::field("NUMACHZ"),
            DescriptorTable::new()
                .field("UNIAAH", "Unit of Measure for AAH", A, 3)
                .when(
                    Condition::text_ne("UNIAAH", ""),
                    DescriptorTable::new().field("AAH", "Absolute Horizontal Accuracy", N, 5),
                )
                .field("UNIAPH", "Unit of Measure for APH", A, 3)
                .when(
                    Condition::text_ne("UNIAPH", ""),
                    DescriptorTable::new().field("APH", "Point-to-Point Horizontal Accuracy", N, 5),
                )
                .field("NUMPTS", "Number of Points in Bounding Polygon", N, 3)
                .repeat(
                    Count::field("NUMPTS"),
                    DescriptorTable::new()
                        .field("LON", "Longitude/Easting", A, 15)
                        .field("LAT", "Latitude/Northing", A, 15),
                ),
        )
}

/// Free-text comment taking the whole body.
pub fn jitcid() -> DescriptorTable {
    DescriptorTable::new().remainder("FILCMT", "File Comment", A)
}

/// Appends `body` gated on `EXISTENCE_MASK & mask`.
fn masked(table: DescriptorTable, mask: u64, body: DescriptorTable) -> DescriptorTable {
    table.when(Condition::mask("EXISTENCE_MASK", mask), body)
}

fn aux_value(format_field: &str) -> DescriptorTable {
    DescriptorTable::new()
        .when(
            Condition::text_eq(format_field, "I"),
            DescriptorTable::new().field("APN", "Auxiliary Parameter Integer Value", N, 10),
        )
        .when(
            Condition::text_eq(format_field, "R"),
            DescriptorTable::new().field("APR", "Auxiliary Parameter Real Value", B, 4),
        )
        .when(
            Condition::text_eq(format_field, "A"),
            DescriptorTable::new().field("APA", "Auxiliary Parameter ASCII Value", N, 20),
        )
}

/// Multispectral band parameters, with most fields gated by
/// `EXISTENCE_MASK` bits.
pub fn bandsb() -> DescriptorTable {
    let header = DescriptorTable::new()
        .field("COUNT", "Number of Bands", N, 5)
        .field("RADIOMETRIC_QUANTITY", "Data Representation", A, 24)
        .field("RADIOMETRIC_QUANTITY_UNIT", "Data Representation Unit", A, 1)
        .field("SCALE_FACTOR", "Cube Scale Factor", B, 4)
        .field("ADDITIVE_FACTOR", "Cube Additive Factor", B, 4)
        .field("ROW_GSD", "Row Ground Sample Distance", N, 7)
        .field("ROW_GSD_UNIT", "Units of Row Ground Sample Distance", A, 1)
        .field("COL_GSD", "Column Ground Sample Distance", N, 7)
        .field("COL_GSD_UNIT", "Units of Column Ground Sample Distance", A, 1)
        .field("SPT_RESP_ROW", "Spatial Response Function (Rows)", N, 7)
        .field("SPT_RESP_UNIT_ROW", "Units of Spatial Response Function (Rows)", A, 1)
        .field("SPT_RESP_COL", "Spatial Response Function (Cols)", N, 7)
        .field("SPT_RESP_UNIT_COL", "Units of Spatial Response Function (Cols)", A, 1)
        .field("DATA_FLD_1", "Field reserved for future use", B, 48)
        .field("EXISTENCE_MASK", "Bit-wise Existence Mask Field", B, 4);

    let header = masked(
        header,
        0x8000_0000,
        DescriptorTable::new()
            .field("RADIOMETRIC_ADJUSTMENT_SURFACE", "Adjustment Surface", A, 24)
            .field(
                "ATMOSPHERIC_ADJUSTMENT_ALTITUDE",
                "Adjustment Altitude Above WGS84 Ellipsoid",
                B,
                4,
            ),
    );
    let header = masked(header, 0x4000_0000, one("DIAMETER", "Diameter of the lens", N, 7));
    let header = masked(header, 0x2000_0000, one("DATA_FLD_2", "Field reserved for future use", B, 32));
    let header = masked(header, 0x01F8_0000, one("WAVE_LENGTH_UNIT", "Wave Length Units", A, 1));

    let mut band = DescriptorTable::new();
    band = masked(band, 0x1000_0000, one("BANDID", "Band n Identifier", A, 50));
    band = masked(band, 0x0800_0000, one("BAD_BAND", "Bad Band Flag", N, 1));
    band = masked(band, 0x0400_0000, one("NIIRS", "NIIRS Value", N, 3));
    band = masked(band, 0x0200_0000, one("FOCAL_LEN", "Band n Focal length", N, 5));
    band = masked(band, 0x0100_0000, one("CWAVE", "Band n Center Response Wavelength", N, 7));
    band = masked(band, 0x0080_0000, one("FWHM", "Band n Width", N, 7));
    band = masked(band, 0x0040_0000, one("FWHM_UNC", "Band n Width Uncertainty", N, 7));
    band = masked(band, 0x0020_0000, one("NOM_WAVE", "Band n Nominal Wavelength", N, 7));
    band = masked(band, 0x0010_0000, one("NOM_WAVE_UNC", "Band n Nominal Wavelength Uncertainty", N, 7));
    band = masked(
        band,
        0x0008_0000,
        DescriptorTable::new()
            .field("LBOUND", "Band n Lower Wavelength Bound", N, 7)
            .field("UBOUND", "Band n Upper Wavelength Bound", N, 7),
    );
    band = masked(
        band,
        0x0004_0000,
        DescriptorTable::new()
            .field("SCALE_FACTOR", "Individual Scale Factor", B, 4)
            .field("ADDITIVE_FACTOR", "Individual Additive Factor", B, 4),
    );
    band = masked(band, 0x0002_0000, one("START_TIME", "Start Time", A, 16));
    band = masked(band, 0x0001_0000, one("INT_TIME", "Integration Time", N, 6));
    band = masked(
        band,
        0x0000_8000,
        DescriptorTable::new()
            .field("CALDRK", "Band n Calibration (Dark)", N, 6)
            .field("CALIBRATION_SENSITIVITY", "Band n Calibration (Increment)", N, 5),
    );
    band = masked(
        band,
        0x0000_4000,
        masked(
            DescriptorTable::new().field("ROW_GSD", "Band n Spatial Response Interval (Row)", N, 7),
            0x0000_2000,
            one("ROW_GSD_UNC", "Band n Spatial Response Interval Uncertainty (Row)", N, 7),
        )
        .field("ROW_GSD_UNIT", "Unit of Row Spacing", A, 1)
        .field("COL_GSD", "Band n Spatial Response Interval (Col)", N, 7)
        .when(
            Condition::mask("EXISTENCE_MASK", 0x0000_2000),
            one("COL_GSD_UNC", "Band n Spatial Response Interval Uncertainty (Col)", N, 7),
        )
        .field("COL_GSD_UNIT", "Unit of Column Spacing", A, 1),
    );
    band = masked(
        band,
        0x0000_1000,
        DescriptorTable::new()
            .field("BKNOISE", "Band n Background Noise", N, 5)
            .field("SCNNOISE", "Band n Scene Noise", N, 5),
    );
    band = masked(
        band,
        0x0000_0800,
        masked(
            DescriptorTable::new().field("SPT_RESP_FUNCTION_ROW", "Band n Spatial Response Function (Row)", N, 7),
            0x0000_0400,
            one("SPT_RESP_UNC_ROW", "Band n Spatial Response Function Uncertainty (Row)", N, 7),
        )
        .field("SPT_RESP_UNIT_ROW", "Unit of Spatial Response (Row)", A, 1)
        .field("SPT_RESP_FUNCTION_COL", "Band n Spatial Response Function (Col)", N, 7)
        .when(
            Condition::mask("EXISTENCE_MASK", 0x0000_0400),
            one("SPT_RESP_UNC_COL", "Band n Spatial Response Function Uncertainty (Col)", N, 7),
        )
        .field("SPT_RESP_UNIT_COL", "Unit of Spatial Response (Col)", A, 1),
    );
    band = masked(band, 0x0000_0200, one("DATA_FLD_3", "Field reserved for future use", B, 16));
    band = masked(band, 0x0000_0100, one("DATA_FLD_4", "Field reserved for future use", B, 24));
    band = masked(band, 0x0000_0080, one("DATA_FLD_5", "Field reserved for future use", B, 32));
    band = masked(band, 0x0000_0040, one("DATA_FLD_6", "Field reserved for future use", B, 48));

    let aux = DescriptorTable::new()
        .field("NUM_AUX_B", "Number of Auxiliary Band Level Parameters (m)", N, 2)
        .field("NUM_AUX_C", "Number of Auxiliary Cube Level Parameters (k)", N, 2)
        .repeat(
            Count::field("NUM_AUX_B"),
            DescriptorTable::new()
                .field("BAPF", "Band Auxiliary Parameter Value Format", A, 1)
                .field("UBAP", "Unit of Band Auxiliary Parameter", A, 7)
                .repeat(Count::field("COUNT"), aux_value("BAPF")),
        )
        .repeat(
            Count::field("NUM_AUX_C"),
            DescriptorTable::new()
                .field("CAPF", "Cube Auxiliary Parameter Value Format", A, 1)
                .field("UCAP", "Unit of Cube Auxiliary Parameter", A, 7)
                .extend(aux_value("CAPF")),
        );

    masked(header.repeat(Count::field("COUNT"), band), 0x0000_0001, aux)
}

fn one(name: &str, label: &str, kind: nitf_core::FieldKind, length: usize) -> DescriptorTable {
    DescriptorTable::new().field(name, label, kind, length)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tre::Tre;

    #[test]
    fn test_engrda_computed_widths() {
        let mut tre = Tre::new("ENGRDA", engrda()).unwrap();
        assert_eq!(tre.current_size().unwrap(), 23);
        tre.set_field("RECNT", &1u8).unwrap();
        // ENGLN and ENGDATC are zero, so ENGLBL and ENGDATA are absent
        assert_eq!(tre.current_size().unwrap(), 23 + 2 + 4 + 4 + 1 + 1 + 2 + 8);
        tre.set_field("ENGLN[0]", &5u8).unwrap();
        tre.set_field("ENGLBL[0]", "TEMPS").unwrap();
        tre.set_field("ENGDTS[0]", &2u8).unwrap();
        tre.set_field("ENGDATC[0]", &3u8).unwrap();
        assert_eq!(tre.get_field("ENGDATA[0]").unwrap().len(), 6);
        tre.set_raw_field("ENGDATA[0]", &[0, 1, 0, 2, 0, 3]).unwrap();
        assert_eq!(tre.current_size().unwrap(), 22 + 23 + 5 + 6);
        assert_eq!(tre.to_bytes().unwrap().len(), tre.current_size().unwrap());
    }

    #[test]
    fn test_acchzb_nested_loop() {
        let mut tre = Tre::new("ACCHZB", acchzb()).unwrap();
        tre.set_field("NUMACHZ", &1u8).unwrap();
        assert!(!tre.is_reachable("AAH[0]").unwrap());
        tre.set_field("UNIAAH[0]", "M").unwrap();
        tre.set_field("AAH[0]", &15u32).unwrap();
        tre.set_field("NUMPTS[0]", &2u8).unwrap();
        tre.set_field("LAT[0][1]", "+45.0").unwrap();
        assert_eq!(tre.current_size().unwrap(), 2 + 3 + 5 + 3 + 3 + 2 * 30);
    }

    #[test]
    fn test_jitcid_takes_whole_body() {
        let tre = Tre::parse("JITCID", None, jitcid(), b"any text at all").unwrap();
        assert_eq!(tre.get::<String>("FILCMT").unwrap(), "any text at all");
    }

    #[test]
    fn test_bandsb_mask_gates_fields() {
        let mut tre = Tre::new("BANDSB", bandsb()).unwrap();
        let base = tre.current_size().unwrap();
        assert_eq!(base, 5 + 24 + 1 + 4 + 4 + 7 + 1 + 7 + 1 + 7 + 1 + 7 + 1 + 48 + 4);

        tre.set_field("COUNT", &2u8).unwrap();
        assert_eq!(tre.current_size().unwrap(), base);

        tre.set_field("EXISTENCE_MASK", &0x0800_0000u32).unwrap();
        assert_eq!(tre.current_size().unwrap(), base + 2);
        assert!(tre.is_reachable("BAD_BAND[1]").unwrap());
        assert!(!tre.is_reachable("BANDID[0]").unwrap());

        tre.set_field("EXISTENCE_MASK", &0x0000_0001u32).unwrap();
        tre.set_field("NUM_AUX_B", &1u8).unwrap();
        tre.set_field("BAPF[0]", "I").unwrap();
        assert!(tre.is_reachable("APN[0][1]").unwrap());
        assert_eq!(tre.current_size().unwrap(), base + 4 + 8 + 2 * 10);
    }
}

use std::io::{self, Write};

use crate::data::branch::FlightDataBranch;
use crate::data::types::DataTypeCatalog;

/// Write a flight data branch as CSV: one column per recorded channel, one
/// row per sample.  Unset values are left empty.
pub fn write_branch<W: Write>(
    writer: &mut W,
    branch: &FlightDataBranch,
    catalog: &DataTypeCatalog,
) -> io::Result<()> {
    let types: Vec<_> = branch.types().collect();

    let header: Vec<&str> = types.iter().map(|&t| catalog.name_of(t)).collect();
    writeln!(writer, "{}", header.join(","))?;

    for row in 0..branch.len() {
        let mut fields = Vec::with_capacity(types.len());
        for &ty in &types {
            let value = branch.get(ty).and_then(|values| values.get(row)).copied();
            match value {
                Some(v) if !v.is_nan() => fields.push(format!("{v:.6}")),
                _ => fields.push(String::new()),
            }
        }
        writeln!(writer, "{}", fields.join(","))?;
    }

    Ok(())
}

/// Write a branch to a CSV file at the given path.
pub fn write_branch_file(
    path: &str,
    branch: &FlightDataBranch,
    catalog: &DataTypeCatalog,
) -> io::Result<()> {
    let mut file = std::fs::File::create(path)?;
    write_branch(&mut file, branch, catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::types::FlightDataType;

    #[test]
    fn csv_output_has_header_and_rows() {
        let mut branch = FlightDataBranch::new("main");
        for (t, alt) in [(0.0, 0.0), (0.05, 1.2)] {
            branch.add_point();
            branch.set_value(FlightDataType::Time, t);
            branch.set_value(FlightDataType::Altitude, alt);
        }

        let mut buf = Vec::new();
        write_branch(&mut buf, &branch, &DataTypeCatalog::new()).unwrap();
        let output = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines.len(), 3); // header + 2 data rows
        assert!(lines[0].starts_with("time,"));
        assert!(lines[1].starts_with("0.000000,"));
        assert!(lines[2].contains("1.200000"));
    }

    #[test]
    fn unset_values_are_empty_fields() {
        let mut branch = FlightDataBranch::new("main");
        branch.add_point();
        branch.set_value(FlightDataType::Time, 0.0);
        branch.add_point();
        branch.set_value(FlightDataType::Time, 0.05);
        branch.set_value(FlightDataType::MachNumber, 0.1);

        let mut buf = Vec::new();
        write_branch(&mut buf, &branch, &DataTypeCatalog::new()).unwrap();
        let output = String::from_utf8(buf).unwrap();
        let first_row = output.lines().nth(1).unwrap();
        // Mach column exists but the first row never set it.
        assert!(first_row.ends_with(','));
    }
}

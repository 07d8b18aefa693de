/// External compound identifier (stable across runs, used as the join key).
/// Example: `CHEMBL133897`
pub type CompoundId = String;
/// Line-notation structure string, possibly holding `.`-separated fragments.
/// Examples: `CCO`, `CC(=O)Oc1ccccc1C(=O)O.[Na+]`
pub type Structure = String;
/// Name of one numeric descriptor column.
/// Examples: `PubchemFP0`, `MW`, `pIC50`
pub type DescriptorName = String;
/// External target identifier used to scope a bioactivity query.
/// Example: `CHEMBL220`
pub type TargetId = String;
/// Header name of a delimited-text column.
/// Examples: `molecule_chembl_id`, `standard_value`, `class`
pub type ColumnName = String;
/// Identifier of an external collaborator (source, descriptor engine, trainer).
/// Examples: `chembl_dump`, `padel`
pub type CollaboratorId = String;

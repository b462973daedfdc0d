mod eigen;
pub(crate) use self::eigen::SymmetricEigen;

use crate::errors::InputError;
use crate::models::CompanyId;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Drivers,
    Vehicles,
    Routes,
    Dispatch,
}

impl Section {
    pub const ALL: [Section; 4] = [Self::Drivers, Self::Vehicles, Self::Routes, Self::Dispatch];

    pub fn slug(self) -> &'static str {
        match self {
            Self::Drivers => "driver-management",
            Self::Vehicles => "vehicle-management",
            Self::Routes => "route-management",
            Self::Dispatch => "dispatch-management",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Drivers => "Driver Management",
            Self::Vehicles => "Vehicle Management",
            Self::Routes => "Route Management",
            Self::Dispatch => "Dispatch Management",
        }
    }

    pub fn requires_company(self) -> bool {
        matches!(self, Self::Routes | Self::Dispatch)
    }

    /// Page a section button leads to for the current selection.
    pub fn target(self, company: Option<&CompanyId>) -> Result<String, InputError> {
        match (self, company) {
            (Self::Drivers, _) => Ok("/driver".to_string()),
            (Self::Vehicles, Some(company)) => Ok(format!("/companyVehicle/{company}")),
            (Self::Vehicles, None) => Ok("/vehicle".to_string()),
            (Self::Routes, Some(company)) => Ok(format!("/routes/{company}")),
            (Self::Dispatch, Some(company)) => Ok(format!("/dispatch/{company}")),
            (Self::Routes | Self::Dispatch, None) => Err(InputError::CompanyRequired),
        }
    }
}

impl FromStr for Section {
    type Err = InputError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|section| section.slug() == raw.trim())
            .ok_or_else(|| InputError::UnknownSection(raw.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vehicles_switch_to_company_dashboard() {
        let company = CompanyId::parse("c1").unwrap();
        assert_eq!(Section::Vehicles.target(None).unwrap(), "/vehicle");
        assert_eq!(
            Section::Vehicles.target(Some(&company)).unwrap(),
            "/companyVehicle/c1"
        );
        assert_eq!(Section::Drivers.target(Some(&company)).unwrap(), "/driver");
    }

    #[test]
    fn routes_and_dispatch_need_a_company() {
        assert_eq!(Section::Routes.target(None), Err(InputError::CompanyRequired));
        assert_eq!(Section::Dispatch.target(None), Err(InputError::CompanyRequired));
        let company = CompanyId::parse("c1").unwrap();
        assert_eq!(Section::Dispatch.target(Some(&company)).unwrap(), "/dispatch/c1");
    }

    #[test]
    fn parses_slugs() {
        assert_eq!("route-management".parse::<Section>(), Ok(Section::Routes));
        assert!(matches!(
            "billing".parse::<Section>(),
            Err(InputError::UnknownSection(_))
        ));
    }
}

//! Static bindings of the governance functions wired during deployment,
//! used to cross-check the dynamically encoded call-data

use alloy_sol_types::sol;

sol! {
    function setGovOps(address govOps) external;
    function setGovExec(address govExec) external;
    function setGovGuard(address govGuard) external;
    function setFactory(address factory) external;
    function setDonation(address donation) external;
    function setGovRes(address govRes) external;
    function addMembersToWhitelist(address[] members) external;
    function setGovernanceParameterByAdmin(bytes32 param, uint256 data) external;
}

//! Solidity interfaces of the read surface used from the ERC-8004 registries.

use alloy_sol_types::sol;

// ERC-721 based identity registry; `ownerOf` reverts for unassigned ids.
sol! {
    interface IIdentityRegistry {
        function ownerOf(uint256 tokenId) external view returns (address);
        function tokenURI(uint256 tokenId) external view returns (string memory);
    }
}

sol! {
    interface IReputationRegistry {
        function getClients(uint256 agentId) external view returns (address[] memory);
        function getSummary(
            uint256 agentId,
            address[] calldata clientAddresses,
            string calldata tag1,
            string calldata tag2
        ) external view returns (uint64 count, int128 summaryValue, uint8 summaryValueDecimals);
    }
}

// Not deployed on most chains yet.
sol! {
    interface IValidationRegistry {
        function getSummary(
            uint256 agentId,
            address[] calldata validatorAddresses,
            string calldata tag
        ) external view returns (uint64 count, uint8 avgResponse);
    }
}

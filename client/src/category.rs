//! Portal endpoints for each likeable content category.

use atom_common::Category;

/// Path of the like request, shared by every category.
pub const LIKE_PATH: &str = "/community/title_like";

/// Query key carrying the item id on the like request.
pub const LIKE_PARAM: &str = "title";

/// How one category is listed, viewed and confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryRules {
    /// Category these rules describe
    pub category: Category,
    /// Listing fragment endpoint
    pub listing_path: &'static str,
    /// Fixed query parameters for the listing request
    pub listing_params: &'static [(&'static str, &'static str)],
    /// Detail view endpoint
    pub detail_path: &'static str,
    /// Query key carrying the item id on the detail request
    pub detail_param: &'static str,
    /// Confirm control text while the item is not yet liked
    pub confirm_label: &'static str,
}

const NOTICES: CategoryRules = CategoryRules {
    category: Category::Notices,
    listing_path: "/community/notice_list_more",
    // The portal spells this key "condtion".
    listing_params: &[("condtion", r#"{"sortCondition":"1","partCondition":""}"#)],
    detail_path: "/community/title_view",
    detail_param: "title",
    confirm_label: "点赞",
};

const MOMENTS: CategoryRules = CategoryRules {
    category: Category::Moments,
    listing_path: "/community/around_help_list_more",
    listing_params: &[("condition", r#"{"tag":"","little":"","sortCondition":""}"#)],
    detail_path: "/community/around_view",
    detail_param: "title",
    confirm_label: "点赞",
};

const CCP_POSTS: CategoryRules = CategoryRules {
    category: Category::CcpPosts,
    listing_path: "/community/ccp_list_more",
    listing_params: &[("category", "80"), ("condition", "{}")],
    detail_path: "/community/ccp_view",
    detail_param: "title",
    confirm_label: "点赞",
};

const PROPOSALS: CategoryRules = CategoryRules {
    category: Category::Proposals,
    listing_path: "/community/proposal_list_more",
    listing_params: &[("condition", "{}")],
    detail_path: "/community/proposal_view",
    detail_param: "caseId",
    confirm_label: "赞成",
};

impl CategoryRules {
    /// Endpoints for `category`
    pub fn of(category: Category) -> &'static CategoryRules {
        match category {
            Category::Notices => &NOTICES,
            Category::Moments => &MOMENTS,
            Category::CcpPosts => &CCP_POSTS,
            Category::Proposals => &PROPOSALS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_category_has_rules() {
        for category in Category::ALL {
            assert_eq!(CategoryRules::of(category).category, category);
        }
    }

    #[test]
    fn test_proposals_use_their_own_label() {
        assert_eq!(CategoryRules::of(Category::Proposals).confirm_label, "赞成");
        assert_eq!(CategoryRules::of(Category::Proposals).detail_param, "caseId");
    }
}
